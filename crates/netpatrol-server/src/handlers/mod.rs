//! Route handlers, one module per resource.

pub mod accounts;
pub mod ghostnets;
pub mod requests;

use axum::extract::{FromRequest, FromRequestParts};

use crate::error::ApiError;

/// `Json` whose rejections render as [`ApiError::BadRequest`].
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// `Path`, rejecting the same way as [`ApiJson`].
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

/// `Query`, rejecting the same way as [`ApiJson`].
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);
