//! List command - the items of one resource type and their variants.

use std::path::PathBuf;

use resrepo::ResourceRepository;
use serde_json::json;

use super::common::{load_config, open_repository, parse_type, print_json, RepoOptions};
use super::finish;
use crate::error::CliError;

/// Arguments for the list command.
pub struct ListArgs {
    pub root: PathBuf,
    pub resource_type: String,
    pub json: bool,
    pub repo: RepoOptions,
}

/// Run the list command.
pub async fn run(args: ListArgs) -> Result<(), CliError> {
    let resource_type = parse_type(&args.resource_type)?;
    let config = load_config(&args.repo)?;
    let repo = open_repository(&args.root, config).await?;
    let items = repo.items_of_type(resource_type);

    if args.json {
        let value: Vec<_> = items
            .iter()
            .map(|item| {
                json!({
                    "name": item.name,
                    "configurations": item
                        .sources
                        .iter()
                        .map(|s| s.configuration.to_string())
                        .collect::<Vec<_>>(),
                })
            })
            .collect();
        print_json(&json!(value), true)?;
    } else {
        for item in items.iter() {
            let variants: Vec<String> = item
                .sources
                .iter()
                .filter(|s| !s.configuration.is_default())
                .map(|s| s.configuration.to_string())
                .collect();
            let marker = if item.has_default() { ' ' } else { '!' };
            if variants.is_empty() {
                println!("{} @{}/{}", marker, resource_type, item.name);
            } else {
                println!("{} @{}/{}  [{}]", marker, resource_type, item.name, variants.join(", "));
            }
        }
        println!("{} item(s)", items.len());
    }

    finish(&repo).await;
    Ok(())
}
