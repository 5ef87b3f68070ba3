use anyhow::Result;
use graphloom_core::SchemaRegistry;

use crate::cli::OutputFormat;
use crate::output;

pub fn execute(format: OutputFormat) -> Result<()> {
    let registry = SchemaRegistry::northwind()?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&registry)?),
        OutputFormat::Table => {
            for table in output::schema_tables(&registry) {
                println!("{}", table);
            }
            println!("\nSources: {}", registry.source_names().join(", "));
        }
    }

    Ok(())
}
