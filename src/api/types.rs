// Request/response types for the HTTP surface
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CreateAccountRequest {
    pub first_name: String,
    pub last_name: String,
    pub password: String,
    /// Opening balance in minor units. Defaults to zero.
    #[serde(default)]
    pub deposit: i64,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub account_number: i64,
    pub password: String,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub account_number: i64,
    pub token: String,
}

#[derive(Serialize, Debug)]
pub struct DeleteResponse {
    pub deleted: i64,
}

#[derive(Serialize, Debug)]
pub struct ApiErrorBody {
    pub error: String,
}
