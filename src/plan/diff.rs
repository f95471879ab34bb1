//! Property-level diffing between recorded and desired resource specs.

use serde_json::Value;

use crate::graph::ResourceKind;

use super::PropertyChange;

/// Compares two resource specs field by field at the top level.
///
/// Both values are the canonical JSON form of a tagged
/// [`ResourceSpec`](crate::graph::ResourceSpec); the `kind` tag itself is
/// skipped.
pub fn diff_properties(recorded: &Value, desired: &Value) -> Vec<PropertyChange> {
    let empty = serde_json::Map::new();
    let recorded = recorded.as_object().unwrap_or(&empty);
    let desired = desired.as_object().unwrap_or(&empty);

    let mut changes = Vec::new();
    for (key, old) in recorded {
        if key == "kind" {
            continue;
        }
        match desired.get(key) {
            Some(new) if new == old => {}
            Some(new) => changes.push(PropertyChange {
                path: key.clone(),
                old: old.clone(),
                new: new.clone(),
            }),
            None => changes.push(PropertyChange {
                path: key.clone(),
                old: old.clone(),
                new: Value::Null,
            }),
        }
    }
    for (key, new) in desired {
        if key == "kind" || recorded.contains_key(key) {
            continue;
        }
        changes.push(PropertyChange {
            path: key.clone(),
            old: Value::Null,
            new: new.clone(),
        });
    }
    changes
}

/// Whether the changed properties force a replace instead of an in-place
/// update.
pub fn requires_replacement(kind: ResourceKind, changes: &[PropertyChange]) -> bool {
    let identity = identity_fields(kind);
    changes.iter().any(|c| identity.contains(&c.path.as_str()))
}

/// The properties that pin a resource's identity. Changing one of these
/// cannot be expressed as an in-place mutation by any provider.
fn identity_fields(kind: ResourceKind) -> &'static [&'static str] {
    match kind {
        ResourceKind::Network => &["cidr"],
        ResourceKind::Subnet => &["network", "tier", "cidr"],
        ResourceKind::Peering => &["requester", "accepter"],
        ResourceKind::InterfaceEndpoint => &["network", "service"],
        ResourceKind::GatewayEndpoint => &["network", "service"],
        ResourceKind::Route => &["subnet", "destination", "via_peering"],
        ResourceKind::SecurityGroup => &["network"],
        ResourceKind::Instance => &["subnet"],
    }
}
