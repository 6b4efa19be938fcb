use serde_json::{json, Map, Value};

use crate::cli::utils::{output_value, render_table};
use crate::cli::OutputFormat;
use crate::gateway::{PermissionRule, ResourceType, POLICY, ROUTE_OPTIMIZATION};
use crate::types::Operation;

pub fn handle(output_format: OutputFormat) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => output_value(&output_format, &policy_json()),
        OutputFormat::Text => {
            println!("{}", policy_text());
            println!();
            println!("route optimization: {}", ROUTE_OPTIMIZATION);
            Ok(())
        }
    }
}

/// One cell of the table: `ADMIN,DISPATCHER +DRIVER(assigned_driver)`, or `-` when denied
fn describe(rule: &PermissionRule) -> String {
    match rule.scoped {
        Some((roles, scope)) if rule.full.is_empty() => format!("{}({})", roles, scope.owner_field()),
        Some((roles, scope)) => format!("{} +{}({})", rule.full, roles, scope.owner_field()),
        None => rule.full.to_string(),
    }
}

pub fn policy_text() -> String {
    let mut headers = vec!["resource"];
    headers.extend(Operation::ALL.iter().map(|op| op.as_str()));

    let rows: Vec<Vec<String>> = ResourceType::ALL
        .iter()
        .map(|resource| {
            let mut row = vec![resource.segment().to_string()];
            row.extend(Operation::ALL.iter().map(|op| describe(POLICY.rule(*resource, *op))));
            row
        })
        .collect();

    render_table(&headers, &rows)
}

pub fn policy_json() -> Value {
    let mut resources = Map::new();
    for resource in ResourceType::ALL {
        let mut ops = Map::new();
        for op in Operation::ALL {
            let rule = POLICY.rule(resource, op);
            ops.insert(
                op.as_str().to_string(),
                json!({
                    "full": rule.full.iter().map(|role| role.as_str()).collect::<Vec<_>>(),
                    "scoped": rule.scoped.map(|(roles, scope)| json!({
                        "roles": roles.iter().map(|role| role.as_str()).collect::<Vec<_>>(),
                        "owner_field": scope.owner_field(),
                    })),
                }),
            );
        }
        resources.insert(resource.segment().to_string(), Value::Object(ops));
    }

    json!({
        "resources": resources,
        "route_optimization": ROUTE_OPTIMIZATION.iter().map(|role| role.as_str()).collect::<Vec<_>>(),
    })
}
