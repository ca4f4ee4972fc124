use gruha_shared::error::ApiError;
use gruha_shared::schema::{self, EntitySchema};
use gruha_shared::types::{
    CredentialsRequest, RefreshRequest, RefreshResponse, RegistrationResponse, Role,
};
use gruha_shared::AppState;
use lambda_http::{
    http::{Method, StatusCode},
    Body, Error, Request, Response,
};
use serde::Serialize;
use std::sync::Arc;

/// Main Lambda handler - routes requests to health, auth and resource endpoints
pub(crate) async fn function_handler(
    event: Request,
    state: Arc<AppState>,
) -> Result<Response<Body>, Error> {
    let method = event.method();
    let path = event.uri().path();
    let body = event.body();
    tracing::info!("API Lambda invoked - Method: {} Path: {}", method, path);

    // Handle CORS preflight
    if method == "OPTIONS" {
        return Ok(Response::builder()
            .status(StatusCode::OK)
            .header("Access-Control-Allow-Origin", "*")
            .header(
                "Access-Control-Allow-Methods",
                "GET,POST,PATCH,DELETE,OPTIONS",
            )
            .header("Access-Control-Allow-Headers", "Content-Type,Authorization")
            .body(Body::Empty)
            .map_err(Box::new)?);
    }

    let authorization = event
        .headers()
        .get("Authorization")
        .and_then(|value| value.to_str().ok());
    let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    match (method, parts.as_slice()) {
        (&Method::GET, ["health"]) => json_response(
            StatusCode::OK,
            &serde_json::json!({
                "status": "ok",
                "timestamp": chrono::Utc::now().to_rfc3339(),
            }),
        ),

        // --- AUTH / ONBOARDING ---
        (&Method::POST, ["auth", "register-step1"]) => {
            register_step1(&state, Role::Investor, body).await
        }
        (&Method::POST, ["auth", "register-step2", account_id]) => {
            register_step2(&state, Role::Investor, account_id, body).await
        }
        (&Method::POST, ["auth", "builder-register-step1"]) => {
            register_step1(&state, Role::Builder, body).await
        }
        (&Method::POST, ["auth", "builder-register-step2", account_id]) => {
            register_step2(&state, Role::Builder, account_id, body).await
        }
        (&Method::POST, ["auth", "login"]) => login(&state, body).await,
        (&Method::POST, ["auth", "refresh"]) => refresh(&state, body).await,
        (&Method::GET, ["auth", "me"]) => current_account(&state, authorization).await,

        // --- RESOURCE COLLECTIONS ---
        (method, ["builders", tail @ ..]) => {
            resource_routes(&state, &schema::BUILDER, method, tail, authorization, body).await
        }
        (method, ["projects", tail @ ..]) => {
            resource_routes(&state, &schema::PROJECT, method, tail, authorization, body).await
        }

        _ => {
            tracing::warn!("No route matched - Method: {} Path: {}", method, path);
            not_found()
        }
    }
}

/// Identical contract for the builders and projects collections: public
/// reads, bearer-gated mutations, one repository instance per kind.
async fn resource_routes(
    state: &AppState,
    entity: &'static EntitySchema,
    method: &Method,
    tail: &[&str],
    authorization: Option<&str>,
    body: &[u8],
) -> Result<Response<Body>, Error> {
    let repository = state.repository(entity);

    match (method, tail) {
        (&Method::GET, []) => match repository.list().await {
            Ok(records) => json_response(StatusCode::OK, &records),
            Err(e) => e.into_response(),
        },
        (&Method::GET, [id]) => match repository.get_by_id(id).await {
            Ok(record) => json_response(StatusCode::OK, &record),
            Err(e) => e.into_response(),
        },
        (&Method::POST, []) => {
            if let Err(e) = state.gateway().authorize(authorization).await {
                return e.into_response();
            }
            let payload: serde_json::Value = match serde_json::from_slice(body) {
                Ok(value) => value,
                Err(e) => return ApiError::invalid_body(e).into_response(),
            };
            match repository.create(&payload).await {
                Ok(record) => json_response(StatusCode::CREATED, &record),
                Err(e) => e.into_response(),
            }
        }
        (&Method::PATCH, [id]) => {
            if let Err(e) = state.gateway().authorize(authorization).await {
                return e.into_response();
            }
            let payload: serde_json::Value = match serde_json::from_slice(body) {
                Ok(value) => value,
                Err(e) => return ApiError::invalid_body(e).into_response(),
            };
            match repository.update(id, &payload).await {
                Ok(record) => json_response(StatusCode::OK, &record),
                Err(e) => e.into_response(),
            }
        }
        (&Method::DELETE, [id]) => {
            if let Err(e) = state.gateway().authorize(authorization).await {
                return e.into_response();
            }
            match repository.delete(id).await {
                Ok(()) => no_content(),
                Err(e) => e.into_response(),
            }
        }
        (_, []) | (_, [_]) => method_not_allowed(),
        _ => not_found(),
    }
}

async fn register_step1(
    state: &AppState,
    role: Role,
    body: &[u8],
) -> Result<Response<Body>, Error> {
    let request: CredentialsRequest = match serde_json::from_slice(body) {
        Ok(request) => request,
        Err(e) => return ApiError::invalid_body(e).into_response(),
    };

    match state
        .registration()
        .begin(role, &request.email, &request.password)
        .await
    {
        Ok(account_id) => {
            let message = match role {
                Role::Investor => "Account created. Please proceed to profile details.",
                Role::Builder => "Builder account created. Please proceed to company details.",
            };
            json_response(
                StatusCode::CREATED,
                &RegistrationResponse {
                    account_id,
                    message: message.to_string(),
                },
            )
        }
        Err(e) => e.into_response(),
    }
}

async fn register_step2(
    state: &AppState,
    role: Role,
    account_id: &str,
    body: &[u8],
) -> Result<Response<Body>, Error> {
    let profile: serde_json::Value = match serde_json::from_slice(body) {
        Ok(value) => value,
        Err(e) => return ApiError::invalid_body(e).into_response(),
    };

    match state.registration().complete(account_id, &profile).await {
        Ok(()) => {
            let message = match role {
                Role::Investor => "Profile saved successfully",
                Role::Builder => "Builder profile submitted for verification",
            };
            json_response(StatusCode::OK, &serde_json::json!({ "message": message }))
        }
        Err(e) => e.into_response(),
    }
}

async fn login(state: &AppState, body: &[u8]) -> Result<Response<Body>, Error> {
    let request: CredentialsRequest = match serde_json::from_slice(body) {
        Ok(request) => request,
        Err(e) => return ApiError::invalid_body(e).into_response(),
    };

    match state.gateway().login(&request.email, &request.password).await {
        Ok(response) => json_response(StatusCode::OK, &response),
        Err(e) => e.into_response(),
    }
}

async fn refresh(state: &AppState, body: &[u8]) -> Result<Response<Body>, Error> {
    let request: RefreshRequest = match serde_json::from_slice(body) {
        Ok(request) => request,
        Err(e) => return ApiError::invalid_body(e).into_response(),
    };

    match state
        .gateway()
        .refresh(&request.account_id, &request.refresh_token)
        .await
    {
        Ok(session) => json_response(
            StatusCode::OK,
            &RefreshResponse {
                access_token: session.access_token,
                expires_in: session.expires_in,
            },
        ),
        Err(e) => e.into_response(),
    }
}

async fn current_account(
    state: &AppState,
    authorization: Option<&str>,
) -> Result<Response<Body>, Error> {
    let claims = match state.gateway().authorize(authorization).await {
        Ok(claims) => claims,
        Err(e) => return e.into_response(),
    };

    match state.accounts().get(&claims.account_id).await {
        Ok(Some(account)) => json_response(StatusCode::OK, &account),
        Ok(None) => ApiError::NotFound("User not found".to_string()).into_response(),
        Err(e) => e.into_response(),
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(serde_json::to_string(body)?.into())
        .map_err(Box::new)?)
}

fn no_content() -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header("Access-Control-Allow-Origin", "*")
        .body(Body::Empty)
        .map_err(Box::new)?)
}

fn not_found() -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(StatusCode::NOT_FOUND)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(serde_json::json!({"error": "Not found"}).to_string().into())
        .map_err(Box::new)?)
}

fn method_not_allowed() -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(StatusCode::METHOD_NOT_ALLOWED)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(
            serde_json::json!({"error": "Method not allowed"})
                .to_string()
                .into(),
        )
        .map_err(Box::new)?)
}
