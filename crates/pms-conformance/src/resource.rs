//! # Resource Checks
//!
//! The checks run for every resource of a role:
//!
//! | Check | Request | Asserts |
//! |-------|---------|---------|
//! | `should return resources` | `GET /{r}` | 200, contract |
//! | `should only contain viewable fields` | (fetched collection) | per-item field visibility |
//! | `a single item` | `GET /{r}/{id}` | 200, contract |
//! | `can not add empty data` | `POST /{r}` with `{}` | 400, create-permission message |

use pms_client::PmsClient;
use pms_core::contract::{expected_empty_create_error, REJECTED_STATUS};
use pms_core::Session;
use serde_json::{json, Map, Value};

use crate::checks::{expect_error, CheckContext};
use crate::report::{Outcome, Report};

pub const RETURN_RESOURCES: &str = "should return resources";
pub const VIEWABLE_FIELDS: &str = "should only contain viewable fields";
pub const SINGLE_ITEM: &str = "a single item";
pub const EMPTY_CREATE: &str = "can not add empty data";

/// Run all resource checks for `resource` as `session`.
///
/// `client` must already be authorized for the session.
pub async fn run(
    ctx: &CheckContext<'_>,
    client: &PmsClient,
    session: &Session,
    suite: &str,
    resource: &str,
    report: &mut Report,
) {
    let collection = match fetch_collection(ctx, client, resource).await {
        Ok(collection) => {
            report.record(suite, RETURN_RESOURCES, Outcome::Passed);
            Some(collection)
        }
        Err(reason) => {
            report.record(suite, RETURN_RESOURCES, Outcome::Failed(reason));
            None
        }
    };

    match &collection {
        Some(Some(items)) => {
            report.record(suite, VIEWABLE_FIELDS, check_visibility(ctx, session, resource, items));
            let outcome = match items.keys().next() {
                Some(id) => Outcome::from_result(single_item(ctx, client, resource, id).await),
                None => Outcome::Skipped("collection is empty".into()),
            };
            report.record(suite, SINGLE_ITEM, outcome);
        }
        Some(None) => {
            let reason = format!("response has no `{resource}` collection");
            report.record(suite, VIEWABLE_FIELDS, Outcome::Failed(reason.clone()));
            report.record(suite, SINGLE_ITEM, Outcome::Skipped(reason));
        }
        None => {
            let reason = "collection could not be fetched".to_string();
            report.record(suite, VIEWABLE_FIELDS, Outcome::Skipped(reason.clone()));
            report.record(suite, SINGLE_ITEM, Outcome::Skipped(reason));
        }
    }

    let outcome = Outcome::from_result(empty_create(ctx, client, session, resource).await);
    report.record(suite, EMPTY_CREATE, outcome);
}

/// `GET /{resource}`; the collection is the map under the resource key,
/// `None` when the body has none.
async fn fetch_collection(
    ctx: &CheckContext<'_>,
    client: &PmsClient,
    resource: &str,
) -> Result<Option<Map<String, Value>>, String> {
    let resp = client.list(resource).await.map_err(|e| e.to_string())?;
    ctx.expect(&resp, 200, "GET", &format!("/{resource}"))?;
    Ok(resp.body.get(resource).and_then(Value::as_object).cloned())
}

/// Every item must expose only the fields its ownership allows.
///
/// Each offending item is reported on its own line with the exact fields
/// and whether it was evaluated as own or other.
pub fn check_visibility(
    ctx: &CheckContext<'_>,
    session: &Session,
    resource: &str,
    items: &Map<String, Value>,
) -> Outcome {
    let differ = session.differ().with_id_fields(ctx.id_fields);

    let failures: Vec<String> = differ
        .check_collection(resource, items)
        .into_iter()
        .filter_map(|result| match result {
            Ok(violation) if violation.is_empty() => None,
            Ok(violation) => Some(violation.to_string()),
            Err(invalid) => Some(invalid.to_string()),
        })
        .collect();

    if failures.is_empty() {
        Outcome::Passed
    } else {
        Outcome::Failed(failures.join("\n"))
    }
}

async fn single_item(
    ctx: &CheckContext<'_>,
    client: &PmsClient,
    resource: &str,
    id: &str,
) -> Result<(), String> {
    let resp = client.get(resource, id).await.map_err(|e| e.to_string())?;
    ctx.expect(&resp, 200, "GET", &format!("/{resource}/{{{resource}_id}}"))
}

/// Rejection of an empty create depends on whether the role may create.
async fn empty_create(
    ctx: &CheckContext<'_>,
    client: &PmsClient,
    session: &Session,
    resource: &str,
) -> Result<(), String> {
    let resp = client
        .create(resource, &json!({}))
        .await
        .map_err(|e| e.to_string())?;
    ctx.expect_status(&resp, REJECTED_STATUS)?;
    expect_error(&resp, &expected_empty_create_error(session.permissions(), resource))
}
