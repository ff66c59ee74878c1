use crate::cli::{GlobalArgs, load_registry};
use crate::config::AppConfig;

pub async fn execute(global: GlobalArgs) -> anyhow::Result<()> {
    let cfg = AppConfig::load_or_default()?;
    let registry = load_registry(&global, &cfg)?;

    println!("{:<4} {:<32} {:<40}", "#", "Name", "Identifier");
    println!("{}", "-".repeat(78));
    for (i, d) in registry.descriptors().iter().enumerate() {
        println!("{:<4} {:<32} {:<40}", i + 1, d.name, d.architecture_id);
    }
    println!("\n{} model type(s).", registry.len());
    Ok(())
}
