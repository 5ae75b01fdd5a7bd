//! Implementation of the `kiln features` command.

use kiln_core::{
    application::{CatalogService, FeatureInfo},
    domain::FeatureRegistry,
};

use crate::{
    cli::{FeaturesArgs, ListFormat, OutputFormat},
    error::CliResult,
    output::OutputManager,
};

pub fn execute(args: FeaturesArgs, output: OutputManager) -> CliResult<()> {
    let catalog = CatalogService::new(FeatureRegistry::builtin());
    let format = if output.format() == OutputFormat::Json {
        ListFormat::Json
    } else {
        args.format
    };

    if let Some(name) = &args.feature {
        let info = catalog.get(name)?;
        return match format {
            ListFormat::Json => Ok(output.json(&info)?),
            ListFormat::List => Ok(output.print(&info.id)?),
            ListFormat::Table => detail(&info, &output),
        };
    }

    let features = catalog.list();
    match format {
        ListFormat::Table => {
            output.header("Available features:")?;
            let width = features.iter().map(|f| f.id.len()).max().unwrap_or(0);
            for info in &features {
                output.print(&row(info, width))?;
            }
            output.print("")?;
            output.print("Add one with: kiln add <FEATURE>...")?;
        }
        ListFormat::List => {
            for info in &features {
                output.print(&info.id)?;
            }
        }
        // JSON must be parseable even in quiet mode.
        ListFormat::Json => output.json(&features)?,
    }

    Ok(())
}

fn row(info: &FeatureInfo, width: usize) -> String {
    let mut line = format!("  {:<width$}  {}", info.id, info.summary);
    if !info.aliases.is_empty() {
        line.push_str(&format!(" (alias: {})", info.aliases.join(", ")));
    }
    line
}

fn detail(info: &FeatureInfo, output: &OutputManager) -> CliResult<()> {
    output.header(&info.id)?;
    output.print(&format!("  {}", info.summary))?;
    let lines = [
        ("aliases", info.aliases.join(", ")),
        ("requires", info.requires.join(", ")),
        ("directories", info.directories.join(", ")),
        ("dependencies", info.runtime_dependencies.join(", ")),
        ("dev", info.dev_dependencies.join(", ")),
    ];
    for (label, value) in lines.iter().filter(|(_, v)| !v.is_empty()) {
        output.print(&format!("  {label:<13}{value}"))?;
    }
    if info.downloads_skeleton {
        output.print("  downloads an application skeleton on first add")?;
    }
    Ok(())
}
