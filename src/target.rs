//! Configuración del sistema objetivo.
//!
//! Un [`Target`] combina un modelo de datos, que decide los anchos de
//! los tipos fundamentales, con una plataforma, que decide el triple
//! objetivo, el layout de datos y las directivas de visibilidad de
//! símbolos. Se fija antes de iniciar el parsing y no cambia durante
//! una compilación.

use std::{
    fmt::{self, Display},
    str::FromStr,
};

use unicase::Ascii as NoCase;

/// Convención de anchos para los tipos enteros y punteros.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DataModel {
    Lp32,
    Ilp32,
    Llp64,
    Lp64,
    Ilp64,
    ArduinoOld,
    Arduino,
}

/// Anchos en bytes de cada tipo fundamental bajo un modelo de datos.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Widths {
    pub char: u32,
    pub short: u32,
    pub int: u32,
    pub long: u32,
    pub long_long: u32,
    pub long_double: u32,
    pub pointer: u32,
}

impl DataModel {
    /// Tabla de anchos, en bytes.
    #[rustfmt::skip]
    pub fn widths(self) -> Widths {
        use DataModel::*;

        let (char, short, int, long, long_long, long_double, pointer) = match self {
            Lp32       => (1, 2, 2, 4, 8, 10, 4),
            Ilp32      => (1, 2, 4, 4, 8, 10, 4),
            Llp64      => (1, 2, 4, 4, 8, 10, 8),
            Lp64       => (1, 2, 4, 8, 8, 10, 8),
            Ilp64      => (1, 4, 8, 8, 8, 10, 8),
            ArduinoOld => (1, 2, 2, 4, 8, 10, 4),
            Arduino    => (1, 2, 4, 8, 8, 10, 4),
        };

        Widths { char, short, int, long, long_long, long_double, pointer }
    }

    /// Nombres aceptados en línea de comandos.
    pub const NAMES: &'static [&'static str] =
        &["lp32", "ilp32", "llp64", "lp64", "ilp64", "arduino-old", "arduino"];
}

impl Default for DataModel {
    fn default() -> Self {
        DataModel::Lp64
    }
}

impl Display for DataModel {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        use DataModel::*;

        let name = match self {
            Lp32 => "LP32",
            Ilp32 => "ILP32",
            Llp64 => "LLP64",
            Lp64 => "LP64",
            Ilp64 => "ILP64",
            ArduinoOld => "arduino-old",
            Arduino => "arduino",
        };

        fmt.write_str(name)
    }
}

impl FromStr for DataModel {
    type Err = ();

    fn from_str(string: &str) -> Result<Self, Self::Err> {
        use DataModel::*;

        const MODELS: &[(NoCase<&str>, DataModel)] = &[
            (NoCase::new("lp32"), Lp32),
            (NoCase::new("ilp32"), Ilp32),
            (NoCase::new("llp64"), Llp64),
            (NoCase::new("lp64"), Lp64),
            (NoCase::new("ilp64"), Ilp64),
            (NoCase::new("arduino-old"), ArduinoOld),
            (NoCase::new("arduino"), Arduino),
        ];

        MODELS
            .iter()
            .find(|&&(name, _)| name == NoCase::new(string))
            .map(|&(_, model)| model)
            .ok_or(())
    }
}

/// Plataforma objetivo.
///
/// Solo afecta encabezados de módulo y directivas de visibilidad; la
/// arquitectura es siempre x86-64.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Platform {
    Linux,
    Windows,
    Darwin,
}

impl Platform {
    pub fn triple(self) -> &'static str {
        match self {
            Platform::Linux => "x86_64-pc-linux-gnu",
            Platform::Windows => "x86_64-pc-windows-msvc",
            Platform::Darwin => "x86_64-apple-macosx10.15.0",
        }
    }

    pub fn data_layout(self) -> &'static str {
        match self {
            Platform::Linux => {
                "e-m:e-p270:32:32-p271:32:32-p272:64:64-i64:64-f80:128-n8:16:32:64-S128"
            }

            Platform::Windows => {
                "e-m:w-p270:32:32-p271:32:32-p272:64:64-i64:64-f80:128-n8:16:32:64-S128"
            }

            Platform::Darwin => "e-m:o-i64:64-f80:128-n8:16:32:64-S128",
        }
    }

    /// Prefijo de visibilidad para un símbolo.
    ///
    /// `export` solo tiene efecto sobre definiciones.
    pub fn visibility(self, defined: bool, export: bool) -> &'static str {
        match self {
            Platform::Linux => "dso_local ",
            Platform::Windows if defined && export => "dso_local dllexport ",
            Platform::Windows => "dso_local ",
            Platform::Darwin => "",
        }
    }

    /// Nombres aceptados en línea de comandos.
    pub const NAMES: &'static [&'static str] = &["native", "linux", "windows", "darwin"];
}

impl Default for Platform {
    fn default() -> Self {
        Platform::Linux
    }
}

impl FromStr for Platform {
    type Err = ();

    fn from_str(string: &str) -> Result<Self, Self::Err> {
        let string = NoCase::new(string);
        if string == NoCase::new("native") || string == NoCase::new("linux") {
            Ok(Platform::Linux)
        } else if string == NoCase::new("windows") {
            Ok(Platform::Windows)
        } else if string == NoCase::new("darwin") {
            Ok(Platform::Darwin)
        } else {
            Err(())
        }
    }
}

/// Configuración completa de una compilación.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Target {
    pub model: DataModel,
    pub platform: Platform,
}

impl Target {
    pub fn new(model: DataModel, platform: Platform) -> Self {
        Target { model, platform }
    }

    /// Atajo a la tabla de anchos del modelo de datos.
    pub fn widths(&self) -> Widths {
        self.model.widths()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_models_parse_case_insensitively() {
        assert_eq!("LP64".parse(), Ok(DataModel::Lp64));
        assert_eq!("ilp32".parse(), Ok(DataModel::Ilp32));
        assert_eq!("Arduino-Old".parse(), Ok(DataModel::ArduinoOld));
        assert_eq!("lp128".parse::<DataModel>(), Err(()));

        for name in DataModel::NAMES {
            assert!(name.parse::<DataModel>().is_ok(), "{}", name);
        }
    }

    #[test]
    fn width_tables() {
        assert_eq!(DataModel::Lp64.widths().long, 8);
        assert_eq!(DataModel::Llp64.widths().long, 4);
        assert_eq!(DataModel::Ilp64.widths().int, 8);
        assert_eq!(DataModel::Arduino.widths().pointer, 4);
        assert_eq!(Target::default().widths().int, 4);
    }

    #[test]
    fn visibility_directives() {
        assert_eq!(Platform::Linux.visibility(true, true), "dso_local ");
        assert_eq!(Platform::Windows.visibility(true, true), "dso_local dllexport ");
        assert_eq!(Platform::Windows.visibility(false, true), "dso_local ");
        assert_eq!(Platform::Darwin.visibility(true, false), "");
        assert_eq!("native".parse(), Ok(Platform::Linux));
    }
}
