//! Rastreo de ubicaciones originales en código fuente.
//!
//! Los distintos objetos internos que el compilador construye
//! deben llevar cuenta de rangos de ubicaciones en el código fuente
//! original, lo cual permite determinar un punto exacto o aproximado
//! en donde ocurre un error de abstracción arbitraria.
//!
//! A diferencia de un flujo carácter por carácter, el scanner trabaja
//! sobre un búfer completo y se desplaza con un cursor de bytes. Las
//! posiciones línea-columna se resuelven bajo demanda recorriendo el
//! búfer desde su inicio hasta el byte de interés.

use std::{
    fmt::{self, Debug, Display, Formatter},
    io::{self, Read},
    ops::Range,
    rc::Rc,
};

/// Ancho de los divisores de tabulador.
const TAB_STOP: u32 = 4;

/// Un objeto cualquiera con una posición original asociada.
#[derive(Debug, Clone)]
pub struct Located<T> {
    location: Location,
    value: T,
}

impl<T> Located<T> {
    /// Obtiene el valor.
    pub fn val(&self) -> &T {
        &self.value
    }

    /// Obtiene la ubicación.
    pub fn location(&self) -> &Location {
        &self.location
    }

    /// Descarta la ubicación y toma ownership del valor.
    pub fn into_inner(self) -> T {
        self.value
    }

    /// Descompone y toma ownership de las dos partes.
    pub fn split(self) -> (Location, T) {
        (self.location, self.value)
    }

    /// Construye a partir de un valor y una ubicación.
    pub fn at(value: T, location: Location) -> Self {
        Located { value, location }
    }

    /// Transforma el valor con la misma ubicación.
    pub fn map<U, F>(self, map: F) -> Located<U>
    where
        F: FnOnce(T) -> U,
    {
        Located {
            value: map(self.value),
            location: self.location,
        }
    }
}

impl<T> AsRef<T> for Located<T> {
    fn as_ref(&self) -> &T {
        &self.value
    }
}

impl<T: Display> Display for Located<T> {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}: {}", self.location, self.value)
    }
}

impl<T: std::error::Error + 'static> std::error::Error for Located<T> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.value)
    }
}

/// Archivo de código fuente completo en memoria.
pub struct Source {
    name: String,
    text: String,
}

impl Source {
    /// Construye un origen a partir de texto ya cargado.
    pub fn new<N, T>(name: N, text: T) -> Rc<Self>
    where
        N: Into<String>,
        T: Into<String>,
    {
        Rc::new(Source {
            name: name.into(),
            text: text.into(),
        })
    }

    /// Lee por completo un flujo de entrada.
    pub fn load<R, N>(mut reader: R, name: N) -> io::Result<Rc<Self>>
    where
        R: Read,
        N: Into<String>,
    {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;

        Ok(Source::new(name, text))
    }

    /// Nombre del origen, usualmente una ruta.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Texto completo.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Resuelve la posición línea-columna de un byte.
    ///
    /// Los desplazamientos fuera del búfer se acotan a su final.
    pub fn position(&self, offset: usize) -> Position {
        let end = offset.min(self.text.len());

        self.text
            .char_indices()
            .take_while(|&(index, _)| index < end)
            .fold(Position::default(), |position, (_, c)| match c {
                '\n' => position.newline(),
                '\t' => position.tab(),
                _ => position.advance(),
            })
    }

    /// Invoca a `f` con el contenido de la línea indicada, sin salto de línea.
    pub fn with_line<F, R>(&self, line: u32, f: F) -> R
    where
        F: FnOnce(&str) -> R,
    {
        let text = self
            .text
            .lines()
            .nth(line.saturating_sub(1) as usize)
            .unwrap_or("");

        f(text)
    }
}

/// Una ubicación está conformada por un origen y un rango de bytes.
#[derive(Clone)]
pub struct Location {
    from: Rc<Source>,
    span: Range<usize>,
}

impl Location {
    /// Construye una ubicación dentro de un origen.
    pub fn new(from: Rc<Source>, span: Range<usize>) -> Self {
        Location { from, span }
    }

    /// Unifica un rango de ubicaciones. Se asume el mismo origen.
    pub fn span(from: Location, to: &Location) -> Self {
        Location {
            from: from.from,
            span: from.span.start..to.span.end.max(from.span.start),
        }
    }

    /// Origen de esta ubicación.
    pub fn source(&self) -> &Source {
        &self.from
    }

    /// Rango de bytes cubierto.
    pub fn bytes(&self) -> Range<usize> {
        self.span.clone()
    }

    /// Obtiene la posición de inicio.
    pub fn start(&self) -> Position {
        self.from.position(self.span.start)
    }

    /// Obtiene la posición de fin, exclusiva.
    pub fn end(&self) -> Position {
        self.from.position(self.span.end)
    }
}

impl Display for Location {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}:", self.from.name)?;

        let (start, end) = (self.start(), self.end());
        if end == start.advance() || end == start || end.line() != start.line() {
            // Solo se señala una columna en específico
            write!(formatter, "{}", start)
        } else {
            write!(formatter, "[{}-{}]", start, end.back())
        }
    }
}

impl Debug for Location {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        <Self as Display>::fmt(self, formatter)
    }
}

/// Una posición línea-columna en un archivo.
#[derive(Copy, Clone, Eq, PartialEq)]
pub struct Position {
    line: u32,
    column: u32,
}

impl Position {
    /// Obtiene el número de línea.
    pub fn line(&self) -> u32 {
        self.line
    }

    /// Obtiene el número de columna.
    pub fn column(&self) -> u32 {
        self.column
    }

    /// Incrementa el número de columna.
    pub fn advance(self) -> Position {
        Position {
            line: self.line,
            column: self.column + 1,
        }
    }

    /// Decrementa el número de columna.
    pub fn back(self) -> Position {
        Position {
            line: self.line,
            column: self.column.saturating_sub(1).max(1),
        }
    }

    /// Incrementa el número de línea y retorna a la columna 1.
    pub fn newline(self) -> Position {
        Position {
            line: self.line + 1,
            column: 1,
        }
    }

    /// Ajusta la posición a la siguiente columna de tabulador.
    pub fn tab(self) -> Position {
        let column = 1 + ((self.column - 1) / TAB_STOP + 1) * TAB_STOP;
        Position {
            line: self.line,
            column,
        }
    }
}

impl Default for Position {
    fn default() -> Self {
        Position { line: 1, column: 1 }
    }
}

impl Display for Position {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}:{}", self.line, self.column)
    }
}

impl Debug for Position {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        <Self as Display>::fmt(self, formatter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions_follow_lines_and_tabs() {
        let source = Source::new("test.c", "int x;\n\tx = 1;\n");

        assert_eq!(source.position(0), Position { line: 1, column: 1 });
        assert_eq!(source.position(4), Position { line: 1, column: 5 });
        assert_eq!(source.position(7), Position { line: 2, column: 1 });
        assert_eq!(source.position(8), Position { line: 2, column: 5 });
    }

    #[test]
    fn location_display() {
        let source = Source::new("test.c", "int main;");

        let single = Location::new(Rc::clone(&source), 4..5);
        assert_eq!(single.to_string(), "test.c:1:5");

        let range = Location::new(source, 4..8);
        assert_eq!(range.to_string(), "test.c:[1:5-1:8]");
    }

    #[test]
    fn with_line_out_of_range_is_empty() {
        let source = Source::new("test.c", "a\nb");
        source.with_line(2, |line| assert_eq!(line, "b"));
        source.with_line(9, |line| assert_eq!(line, ""));
    }
}
