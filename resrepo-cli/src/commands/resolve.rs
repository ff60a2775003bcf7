//! Resolve command - pick the best variant of resources for a device
//! configuration.

use std::path::PathBuf;

use resrepo::repository::ResolvedResource;
use resrepo::{FolderConfiguration, ResourceRepository, ResourceType};
use serde_json::json;

use super::common::{
    load_config, open_repository, parse_qualifiers, parse_type, print_json, RepoOptions,
};
use super::finish;
use crate::error::CliError;

/// Arguments for the resolve command.
pub struct ResolveArgs {
    pub root: PathBuf,
    pub qualifiers: String,
    pub resource_type: Option<String>,
    pub name: Option<String>,
    pub json: bool,
    pub repo: RepoOptions,
}

/// Run the resolve command.
///
/// With `--type` and `--name` one resource is resolved. Otherwise every
/// item, or every item of `--type`, is resolved against the configuration.
pub async fn run(args: ResolveArgs) -> Result<(), CliError> {
    let target = parse_qualifiers(&args.qualifiers)?;
    let resource_type = args.resource_type.as_deref().map(parse_type).transpose()?;
    if args.name.is_some() && resource_type.is_none() {
        return Err(CliError::Config("--name requires --type".to_string()));
    }

    let config = load_config(&args.repo)?;
    let repo = open_repository(&args.root, config).await?;

    let result = match (resource_type, args.name.as_deref()) {
        (Some(resource_type), Some(name)) => {
            resolve_one(&repo, resource_type, name, &target, args.json)
        }
        _ => resolve_all(&repo, resource_type, &target, args.json),
    };

    finish(&repo).await;
    result
}

fn resolve_one(
    repo: &impl ResourceRepository,
    resource_type: ResourceType,
    name: &str,
    target: &FolderConfiguration,
    json: bool,
) -> Result<(), CliError> {
    let resolved = repo
        .resolve(resource_type, name, target)
        .ok_or_else(|| CliError::NotFound {
            resource_type: resource_type.to_string(),
            name: name.to_string(),
        })?;

    if json {
        print_json(&resolved_json(resource_type, name, &resolved)?, true)
    } else {
        println!("@{}/{}", resource_type, name);
        println!("  From:  {}", resolved.path.display());
        println!("  Match: {}", describe(&resolved));
        println!("  Value: {}", serde_json::to_string(&resolved.value)?);
        Ok(())
    }
}

fn resolve_all(
    repo: &impl ResourceRepository,
    only: Option<ResourceType>,
    target: &FolderConfiguration,
    json: bool,
) -> Result<(), CliError> {
    let resources = repo.configured_resources(target);
    let selected = resources
        .iter()
        .filter(|(t, values)| only.map_or(true, |o| o == **t) && !values.is_empty());

    if json {
        let mut out = serde_json::Map::new();
        for (resource_type, values) in selected {
            let mut by_name = serde_json::Map::new();
            for (name, value) in values {
                by_name.insert(name.clone(), serde_json::to_value(value)?);
            }
            out.insert(resource_type.name().to_string(), by_name.into());
        }
        print_json(&json!(out), true)
    } else {
        for (resource_type, values) in selected {
            for (name, value) in values {
                let shown = match value.text() {
                    Some(text) => text.to_string(),
                    None => serde_json::to_string(value)?,
                };
                println!("@{}/{} = {}", resource_type, name, shown);
            }
        }
        Ok(())
    }
}

fn resolved_json(
    resource_type: ResourceType,
    name: &str,
    resolved: &ResolvedResource,
) -> Result<serde_json::Value, CliError> {
    Ok(json!({
        "type": resource_type.name(),
        "name": name,
        "path": resolved.path.display().to_string(),
        "configuration": resolved.configuration.to_string(),
        "value": serde_json::to_value(&resolved.value)?,
    }))
}

fn describe(resolved: &ResolvedResource) -> String {
    if resolved.configuration.is_default() {
        "default".to_string()
    } else {
        resolved.configuration.to_string()
    }
}
