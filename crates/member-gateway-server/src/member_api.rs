// crates/member-gateway-server/src/member_api.rs
// ============================================================================
// Module: Member GraphQL Surface
// Description: Field table and execution for `/api/v1/graphql/user`.
// Purpose: Enforce identity matching, project selections, and delegate to
//          the backend or the deletion coordinator.
// Dependencies: member-gateway-core, serde, serde_json, tokio
// ============================================================================

//! ## Overview
//! The endpoint accepts exactly four root fields. Every one takes a
//! `firebaseId` argument that must equal the verified caller before anything
//! reaches an upstream. `member`, `createMember`, and `updateMember` are
//! re-issued to the backend as projected documents carrying the caller's
//! bearer token; `deleteMember` runs the deletion workflow and answers from a
//! fixed result object.
//!
//! Backend documents declare every argument the field accepts and send null
//! for the ones the client omitted.

// ============================================================================
// SECTION: Imports
// ============================================================================

use axum::http::StatusCode;
use member_gateway_core::BackendAuth;
use member_gateway_core::BackendError;
use member_gateway_core::DocumentShape;
use member_gateway_core::GatewayError;
use member_gateway_core::GraphQlRequest;
use member_gateway_core::OperationKind;
use member_gateway_core::Principal;
use member_gateway_core::PrincipalId;
use member_gateway_core::SelectionNode;
use member_gateway_core::TokenCache;
use member_gateway_core::build_document;
use member_gateway_core::ensure_identity_match;
use member_gateway_core::project;
use serde::Deserialize;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;

use crate::error::ErrorEntry;
use crate::error::ErrorReply;
use crate::graphql::parse_operation;
use crate::state::GatewayState;

// ============================================================================
// SECTION: Request Body
// ============================================================================

/// Standard GraphQL-over-HTTP request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphQlBody {
    /// Operation document.
    pub query: String,
    /// Operation to run when the document holds several.
    #[serde(default)]
    pub operation_name: Option<String>,
    /// Variable values.
    #[serde(default)]
    pub variables: Option<Map<String, Value>>,
}

// ============================================================================
// SECTION: Field Table
// ============================================================================

/// Argument name carrying the target member.
pub const TARGET_ARGUMENT: &str = "firebaseId";

/// One accepted argument.
#[derive(Debug, Clone, Copy)]
pub struct ArgumentSpec {
    /// Argument name.
    pub name: &'static str,
    /// GraphQL type reference used in backend documents.
    pub type_ref: &'static str,
}

impl ArgumentSpec {
    /// Returns true for non-null arguments.
    #[must_use]
    pub fn is_required(&self) -> bool {
        self.type_ref.ends_with('!')
    }
}

/// How a field is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldTarget {
    /// Forwarded to the member backend.
    Backend,
    /// Handled by the deletion coordinator.
    Deletion,
}

/// One accepted root field.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    /// Operation kind the field belongs to.
    pub kind: OperationKind,
    /// Field name.
    pub name: &'static str,
    /// Accepted arguments in declaration order.
    pub arguments: &'static [ArgumentSpec],
    /// Execution target.
    pub target: FieldTarget,
}

/// Shorthand for table rows.
const fn arg(name: &'static str, type_ref: &'static str) -> ArgumentSpec {
    ArgumentSpec {
        name,
        type_ref,
    }
}

/// Root fields served by the endpoint.
pub const MEMBER_FIELDS: &[FieldSpec] = &[
    FieldSpec {
        kind: OperationKind::Query,
        name: "member",
        arguments: &[arg("firebaseId", "String!")],
        target: FieldTarget::Backend,
    },
    FieldSpec {
        kind: OperationKind::Mutation,
        name: "createMember",
        arguments: &[arg("email", "String!"), arg("firebaseId", "String!"), arg("nickname", "String")],
        target: FieldTarget::Backend,
    },
    FieldSpec {
        kind: OperationKind::Mutation,
        name: "updateMember",
        arguments: &[
            arg("address", "String"),
            arg("birthday", "Date"),
            arg("city", "String"),
            arg("country", "String"),
            arg("district", "String"),
            arg("firebaseId", "String!"),
            arg("gender", "Int"),
            arg("name", "String"),
            arg("nickname", "String"),
            arg("phone", "String"),
            arg("profileImage", "String"),
        ],
        target: FieldTarget::Backend,
    },
    FieldSpec {
        kind: OperationKind::Mutation,
        name: "deleteMember",
        arguments: &[arg("firebaseId", "String!")],
        target: FieldTarget::Deletion,
    },
];

/// Looks up a root field by kind and name.
#[must_use]
pub fn find_field(kind: OperationKind, name: &str) -> Option<&'static FieldSpec> {
    MEMBER_FIELDS.iter().find(|field| field.kind == kind && field.name == name)
}

impl FieldSpec {
    /// Returns the variable declarations for the backend document.
    #[must_use]
    pub fn variable_declarations(&self) -> String {
        self.arguments.iter().map(|argument| format!("${}: {}", argument.name, argument.type_ref)).collect::<Vec<_>>().join(", ")
    }

    /// Returns the root field call for the backend document.
    #[must_use]
    pub fn root_call(&self) -> String {
        let arguments =
            self.arguments.iter().map(|argument| format!("{0}: ${0}", argument.name)).collect::<Vec<_>>().join(", ");
        format!("{}({arguments})", self.name)
    }

    /// Checks resolved arguments and fills omitted ones with null.
    ///
    /// # Errors
    ///
    /// Returns a message for unknown arguments and missing required ones.
    pub fn bind_arguments(&self, mut resolved: Map<String, Value>) -> Result<Map<String, Value>, String> {
        if let Some(unknown) = resolved.keys().find(|key| !self.arguments.iter().any(|argument| argument.name == key.as_str())) {
            return Err(format!("unknown argument \"{unknown}\" on field \"{}\"", self.name));
        }
        let mut bound = Map::new();
        for argument in self.arguments {
            let value = resolved.remove(argument.name).unwrap_or(Value::Null);
            if argument.is_required() && value.is_null() {
                return Err(format!("argument \"{}\" of type \"{}\" is required", argument.name, argument.type_ref));
            }
            bound.insert(argument.name.to_string(), value);
        }
        Ok(bound)
    }
}

// ============================================================================
// SECTION: Execution
// ============================================================================

/// Result type exposed by `deleteMember`.
const DELETE_RESULT_FIELDS: &[&str] = &["success"];

/// Executes one member GraphQL request for a verified caller.
///
/// Returns the full response body on success.
///
/// # Errors
///
/// Returns an [`ErrorReply`] carrying the status and GraphQL-style errors.
pub async fn execute(
    state: &GatewayState,
    caller: &Principal,
    cache: &TokenCache,
    body: GraphQlBody,
) -> Result<Value, ErrorReply> {
    let operation = parse_operation(&body.query, body.operation_name.as_deref()).map_err(bad_request)?;
    let root = &operation.root;
    let field = find_field(operation.kind, &root.name).ok_or_else(|| {
        bad_request(format!("field \"{}\" is not defined on {}", root.name, type_name(operation.kind)))
    })?;
    let resolved = operation.resolve_arguments(&body.variables.unwrap_or_default()).map_err(bad_request)?;
    let variables = field.bind_arguments(resolved).map_err(bad_request)?;
    let target = match variables.get(TARGET_ARGUMENT) {
        Some(Value::String(id)) => PrincipalId::new(id.clone()),
        _ => return Err(bad_request(format!("argument \"{TARGET_ARGUMENT}\" must be a string"))),
    };
    let key = root.response_key();
    ensure_identity_match(caller, &target).map_err(|err| ErrorReply::from_gateway(&err).at_field(key))?;

    let value = match field.target {
        FieldTarget::Deletion => {
            let selection = project_delete_result(&root.selection)?;
            state
                .coordinator
                .delete_member(caller, &target)
                .await
                .map_err(|err| ErrorReply::from_gateway(&GatewayError::from(err)).at_field(key))?;
            selection
        }
        FieldTarget::Backend => {
            let projection = project(&root.selection).map_err(|err| projection_error(&err.to_string()))?;
            let declarations = field.variable_declarations();
            let call = field.root_call();
            let shape = DocumentShape {
                kind: field.kind,
                variables: &declarations,
                root: &call,
            };
            let document = build_document(shape, &projection).map_err(|err| projection_error(&err.to_string()))?;
            let token = cache.token().map_err(|err| ErrorReply::from_gateway(&err))?.clone();
            let request = GraphQlRequest::new(document, variables);
            let auth = BackendAuth::Caller(token);
            let run = state.backend.run(&request, &auth);
            let data = match tokio::time::timeout(state.graphql_timeout, run).await {
                Ok(Ok(data)) => data,
                Ok(Err(err)) => return Err(backend_error(err).at_field(key)),
                Err(_) => return Err(backend_error(BackendError::Timeout).at_field(key)),
            };
            data.get(field.name).cloned().unwrap_or(Value::Null)
        }
    };
    let mut data = Map::new();
    data.insert(key.to_string(), value);
    Ok(json!({ "data": data }))
}

/// Projects the fixed deletion result onto the client's selection.
fn project_delete_result(selection: &[SelectionNode]) -> Result<Value, ErrorReply> {
    if selection.is_empty() {
        return Err(projection_error("selection set is empty"));
    }
    let mut result = Map::new();
    for node in selection {
        if !DELETE_RESULT_FIELDS.contains(&node.name.as_str()) || !node.children.is_empty() {
            return Err(bad_request(format!("field \"{}\" is not defined on DeleteMemberResult", node.name)));
        }
        result.insert(node.name.clone(), Value::Bool(true));
    }
    Ok(Value::Object(result))
}

/// Maps a backend failure to a reply.
fn backend_error(err: BackendError) -> ErrorReply {
    match err {
        BackendError::GraphQl(messages) => ErrorReply {
            status: StatusCode::OK,
            errors: messages
                .into_iter()
                .map(|message| ErrorEntry {
                    message,
                    path: None,
                })
                .collect(),
            data: None,
        },
        BackendError::NotFound(_) => ErrorReply::new(StatusCode::OK, err.to_string()),
        BackendError::Timeout => ErrorReply::from_gateway(&GatewayError::UpstreamTimeout(err.to_string())),
        other => ErrorReply::from_gateway(&GatewayError::UpstreamUnavailable(other.to_string())),
    }
}

/// Builds a 400 reply.
fn bad_request(message: impl ToString) -> ErrorReply {
    ErrorReply::new(StatusCode::BAD_REQUEST, message.to_string())
}

/// Builds a projection failure reply.
fn projection_error(message: &str) -> ErrorReply {
    ErrorReply::from_gateway(&GatewayError::Projection(message.to_string()))
}

/// Returns the schema type name for an operation kind.
const fn type_name(kind: OperationKind) -> &'static str {
    match kind {
        OperationKind::Query => "Query",
        OperationKind::Mutation => "Mutation",
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only assertions are permitted.")]

    use super::*;

    #[test]
    fn create_member_document_header_declares_every_argument() {
        let field = find_field(OperationKind::Mutation, "createMember").unwrap();
        assert_eq!(field.variable_declarations(), "$email: String!, $firebaseId: String!, $nickname: String");
        assert_eq!(field.root_call(), "createMember(email: $email, firebaseId: $firebaseId, nickname: $nickname)");
    }

    #[test]
    fn lookup_respects_operation_kind() {
        assert!(find_field(OperationKind::Query, "member").is_some());
        assert!(find_field(OperationKind::Mutation, "member").is_none());
        assert!(find_field(OperationKind::Query, "deleteMember").is_none());
    }

    #[test]
    fn omitted_arguments_bind_to_null() {
        let field = find_field(OperationKind::Mutation, "updateMember").unwrap();
        let mut resolved = Map::new();
        resolved.insert("firebaseId".to_string(), json!("u1"));
        resolved.insert("city".to_string(), json!("Taipei"));
        let bound = field.bind_arguments(resolved).unwrap();
        assert_eq!(bound.len(), 11);
        assert_eq!(bound["city"], json!("Taipei"));
        assert_eq!(bound["phone"], Value::Null);
    }

    #[test]
    fn unknown_and_missing_arguments_are_rejected() {
        let field = find_field(OperationKind::Mutation, "createMember").unwrap();
        let mut resolved = Map::new();
        resolved.insert("firebaseId".to_string(), json!("u1"));
        let err = field.bind_arguments(resolved.clone()).unwrap_err();
        assert!(err.contains("\"email\""));

        resolved.insert("email".to_string(), json!("a@b.c"));
        resolved.insert("role".to_string(), json!("admin"));
        let err = field.bind_arguments(resolved).unwrap_err();
        assert!(err.contains("unknown argument \"role\""));
    }

    #[test]
    fn delete_result_projects_success_only() {
        assert_eq!(project_delete_result(&[SelectionNode::leaf("success")]).unwrap(), json!({"success": true}));
        assert_eq!(project_delete_result(&[SelectionNode::leaf("id")]).unwrap_err().status, StatusCode::BAD_REQUEST);
        assert_eq!(project_delete_result(&[]).unwrap_err().status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn backend_graphql_errors_are_field_errors() {
        let reply = backend_error(BackendError::GraphQl(vec!["boom".to_string()])).at_field("member");
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.errors[0].path, Some(vec!["member".to_string()]));
        assert_eq!(backend_error(BackendError::Status(500)).status, StatusCode::BAD_GATEWAY);
        assert_eq!(backend_error(BackendError::Timeout).status, StatusCode::GATEWAY_TIMEOUT);
    }
}
