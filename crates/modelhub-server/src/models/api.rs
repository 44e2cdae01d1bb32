//! Common API types and utilities
use axum::{extract::FromRequestParts, http::request::Parts};
use modelhub_registry::UserId;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Header carrying the authenticated caller, set by the auth proxy
pub const USER_ID_HEADER: &str = "x-user-id";

/// Standard pagination parameters
#[derive(Debug, Deserialize)]
pub struct PaginationQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,

    #[serde(default)]
    pub offset: u32,
}

fn default_limit() -> u32 {
    50
}

impl PaginationQuery {
    /// Slice one page out of a fully loaded list
    pub fn paginate<T>(&self, items: Vec<T>) -> PaginatedResponse<T> {
        let total = items.len() as u32;
        let data = items
            .into_iter()
            .skip(self.offset as usize)
            .take(self.limit as usize)
            .collect();
        PaginatedResponse::new(data, self.limit, self.offset, Some(total))
    }
}

/// Standard pagination response
#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub pagination: PaginationInfo,
}

/// Pagination metadata
#[derive(Debug, Serialize)]
pub struct PaginationInfo {
    pub limit: u32,
    pub offset: u32,
    pub total: Option<u32>,
    pub has_more: bool,
}

impl<T> PaginatedResponse<T> {
    pub fn new(data: Vec<T>, limit: u32, offset: u32, total: Option<u32>) -> Self {
        let has_more = match total {
            Some(t) => offset + (data.len() as u32) < t,
            None => data.len() as u32 == limit,
        };

        Self {
            data,
            pagination: PaginationInfo {
                limit,
                offset,
                total,
                has_more,
            },
        }
    }
}

/// Standard API response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            message: None,
        }
    }

    pub fn with_message(data: T, message: String) -> Self {
        Self {
            data,
            message: Some(message),
        }
    }
}

/// Caller identity taken from the `x-user-id` header
#[derive(Debug, Clone)]
pub struct Caller(pub UserId);

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| ApiError::Unauthorized(format!("{} header is required", USER_ID_HEADER)))?;

        Ok(Caller(UserId::from(user)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paginate() {
        let query = PaginationQuery {
            limit: 2,
            offset: 1,
        };
        let page = query.paginate(vec![1, 2, 3, 4]);
        assert_eq!(page.data, vec![2, 3]);
        assert_eq!(page.pagination.total, Some(4));
        assert!(page.pagination.has_more);

        let last = PaginationQuery {
            limit: 10,
            offset: 3,
        }
        .paginate(vec![1, 2, 3, 4]);
        assert_eq!(last.data, vec![4]);
        assert!(!last.pagination.has_more);
    }
}
