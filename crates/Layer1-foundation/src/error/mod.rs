//! Error types for Launchpad
//!
//! 모든 에러를 중앙에서 관리

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Launchpad 에러 타입
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // 설정 관련
    // ========================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    /// A tool entry that failed validation (missing or malformed field)
    #[error("Invalid tool '{id}': {reason}")]
    InvalidTool { id: String, reason: String },

    #[error("Duplicate tool id: {0}")]
    DuplicateTool(String),

    // ========================================================================
    // 프로세스 관련
    // ========================================================================
    /// Spawning the worker failed (interpreter/script missing, permission denied)
    #[error("Failed to start {tool}: {reason}")]
    Spawn { tool: String, reason: String },

    // ========================================================================
    // 일반
    // ========================================================================
    #[error("Not found: {0}")]
    NotFound(String),

    // ========================================================================
    // 외부 에러 변환
    // ========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ========================================================================
    // 기타
    // ========================================================================
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// 설정 문제로 인한 에러인지 확인
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Error::Config(_) | Error::InvalidTool { .. } | Error::DuplicateTool(_)
        )
    }

    /// 사용자에게 보여줄 수 있는 에러인지 확인
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Error::InvalidTool { .. }
                | Error::DuplicateTool(_)
                | Error::Spawn { .. }
                | Error::NotFound(_)
        )
    }

    /// Tool 검증 에러 생성 헬퍼
    pub fn invalid_tool(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidTool {
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// Spawn 에러 생성 헬퍼
    pub fn spawn(tool: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Spawn {
            tool: tool.into(),
            reason: reason.into(),
        }
    }
}

// ============================================================================
// From 구현 (추가 변환)
// ============================================================================

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Internal(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Internal(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(Error::invalid_tool("dash1", "missing script").is_config_error());
        assert!(Error::DuplicateTool("dash1".into()).is_config_error());
        assert!(!Error::spawn("dash1", "no interpreter").is_config_error());

        assert!(Error::spawn("dash1", "no interpreter").is_user_facing());
        assert!(!Error::Internal("boom".into()).is_user_facing());
    }

    #[test]
    fn test_error_display() {
        let err = Error::invalid_tool("dash1", "missing field 'script'");
        assert_eq!(err.to_string(), "Invalid tool 'dash1': missing field 'script'");

        let err = Error::spawn("Voron Temps", "permission denied");
        assert_eq!(err.to_string(), "Failed to start Voron Temps: permission denied");
    }
}
