use anyhow::Result;

fn main() -> Result<()> {
    facet_cli::main_entry()
}
