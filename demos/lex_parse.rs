use c1::{error::Diagnostics, lex::Scanner, source::Source, target::Target};

fn main() {
    let stdin = std::io::stdin();
    let stdin = stdin.lock();

    let source = match Source::load(stdin, "<stdin>") {
        Ok(source) => source,
        Err(error) => return eprintln!("Failed to read stdin: {}", error),
    };

    let diagnostics = match Scanner::new(source.clone()).try_exhaustive() {
        Err(errors) => Diagnostics::from(errors).kind("Lexical error"),

        Ok(tokens) => {
            print!("Tokens: {:#?}\n\n", tokens);

            match c1::analyze(&source, Target::default()) {
                Err(error) => {
                    let kind = error.val().kind();
                    Diagnostics::from(error).kind(kind)
                }

                Ok(program) => {
                    print!("Scopes:\n{}", program.dump_scopes());
                    Diagnostics::default()
                }
            }
        }
    };

    if !diagnostics.is_empty() {
        eprint!("{}", diagnostics);
    }
}
