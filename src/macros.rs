/// Emite una instrucción sin resultado.
macro_rules! emit {
    ($emitter:expr, $($format:tt)*) => {
        $emitter.line(format_args!($($format)*))
    };
}

/// Emite una instrucción cuyo resultado se asigna a un registro nuevo,
/// el cual se retorna como operando.
macro_rules! assign {
    ($emitter:expr, $($format:tt)*) => {
        $emitter.register(format_args!($($format)*))
    };
}

/// Emite el terminador de un bloque básico.
macro_rules! terminate {
    ($emitter:expr, $($format:tt)*) => {
        $emitter.terminator(format_args!($($format)*))
    };
}
