use aws_sdk_cognitoidentityprovider::Client as CognitoClient;
use aws_sdk_dynamodb::Client as DynamoClient;
use gruha_shared::identity::CognitoIdentityProvider;
use gruha_shared::store::DynamoStore;
use gruha_shared::AppState;
use lambda_http::{run, service_fn, tracing, Error, Request};
use std::env;
use std::sync::Arc;

mod http_handler;

/// Environment configuration, resolved exactly once at startup.
struct Config {
    table_name: String,
    cognito_client_id: String,
    cognito_client_secret: String,
    cognito_user_pool_id: String,
}

impl Config {
    fn from_env() -> Self {
        Self {
            table_name: env::var("TABLE_NAME").expect("TABLE_NAME must be set"),
            cognito_client_id: env::var("COGNITO_CLIENT_ID").expect("COGNITO_CLIENT_ID must be set"),
            cognito_client_secret: env::var("COGNITO_CLIENT_SECRET")
                .expect("COGNITO_CLIENT_SECRET must be set"),
            cognito_user_pool_id: env::var("COGNITO_USER_POOL_ID")
                .expect("COGNITO_USER_POOL_ID must be set"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing::init_default_subscriber();

    // Resolve configuration and AWS clients once; every invocation shares them
    let config = Config::from_env();
    let aws_config = aws_config::load_from_env().await;

    let identity = CognitoIdentityProvider::new(
        CognitoClient::new(&aws_config),
        config.cognito_client_id,
        config.cognito_client_secret,
        config.cognito_user_pool_id,
    );
    let store = DynamoStore::new(DynamoClient::new(&aws_config), config.table_name);

    let state = AppState::new(Arc::new(identity), Arc::new(store));

    run(service_fn(move |event: Request| {
        let state = Arc::clone(&state);
        async move { http_handler::function_handler(event, state).await }
    }))
    .await
}
