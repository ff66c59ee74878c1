use crate::cli::{GlobalArgs, InspectArgs, build_inspector, to_json};
use crate::config::AppConfig;

pub async fn execute(global: GlobalArgs, args: InspectArgs) -> anyhow::Result<()> {
    let cfg = AppConfig::load_or_default()?;
    let inspector = build_inspector(&global, &cfg)?;
    let pretty = cfg.pretty && !args.compact;

    for path in &args.paths {
        let result = inspector
            .inspect_file(path)
            .await
            .map_err(|e| anyhow::anyhow!("{}: {e}", path.display()))?;
        println!("{}", to_json(&result, pretty)?);
    }
    Ok(())
}
