//! Target service selection.

use super::PackageOptions;
use crate::errors::{PackflowError, Result};
use crate::project::{ProjectConfig, ServiceConfig};

/// Decides which service a run targets.
///
/// Returns `None` when every service is selected. An explicit target must
/// name a service of the project. Without a target or `all`, a service
/// rooted at the working directory becomes the target.
pub fn resolve_target(project: &ProjectConfig, options: &PackageOptions) -> Result<Option<String>> {
    if let Some(target) = options.target.as_deref() {
        if options.all {
            return Err(PackflowError::InvalidSelection(format!(
                "cannot specify both --all and <service> ({target})"
            )));
        }
        if project.is_empty() {
            return Err(PackflowError::NoServices {
                project: project.name.clone(),
            });
        }
        return match project.get_service(target) {
            Some(service) => Ok(Some(service.name.clone())),
            None => Err(PackflowError::service_not_found(target)),
        };
    }

    if options.all {
        return Ok(None);
    }

    Ok(options
        .cwd
        .as_deref()
        .and_then(|cwd| project.service_at(cwd))
        .map(|service| service.name.clone()))
}

/// Returns true if `service` runs under `target`.
pub(crate) fn is_selected(target: Option<&str>, service: &ServiceConfig) -> bool {
    target.map_or(true, |name| name == service.name)
}
