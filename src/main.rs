use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    storyteller::cli::main()
}
