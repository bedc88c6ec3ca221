use c1::{compile, source::Source, target::Target};

fn main() {
    let stdin = std::io::stdin();
    let stdin = stdin.lock();

    let source = match Source::load(stdin, "<stdin>") {
        Ok(source) => source,
        Err(error) => return eprintln!("Failed to read stdin: {}", error),
    };

    match compile(&source, Target::default()) {
        Ok(ir) => print!("{}", ir),
        Err(error) => match error.diagnostics() {
            Ok(diagnostics) => eprint!("{}", diagnostics),
            Err(error) => eprintln!("{}", error),
        },
    }
}
