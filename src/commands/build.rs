use crate::{BuildArgs, build::Builder, config::SiteConfig};

pub async fn run(args: &BuildArgs) -> Result<(), anyhow::Error> {
    let mut config = SiteConfig::load_from_arg(args.config_file.as_deref())?;

    // Command line overrides are relative to where we are invoked from
    let cwd = std::env::current_dir()?;
    if let Some(input) = &args.input {
        config.input = cwd.join(input);
    }
    if let Some(output) = &args.output {
        config.output = cwd.join(output);
    }

    let builder = Builder::new(config);
    let result = builder.build().await?;

    println!(
        "Built site to {} ({} posts, {} static files)",
        result.output_dir.display(),
        result.posts,
        result.static_files
    );

    if !result.report.is_success() {
        for failure in &result.report.failures {
            eprintln!("  - {}: {}", failure.stage, failure.error);
        }
        return Err(anyhow::anyhow!(
            "{} of {} stage executions failed; output may be incomplete",
            result.report.failures.len(),
            result.report.executed
        ));
    }

    Ok(())
}
