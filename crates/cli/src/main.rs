use anyhow::Result;

fn main() -> Result<()> {
    polyz_cli::main_entry()
}
