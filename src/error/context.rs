use crate::error::{AppError, AppResult};
use thiserror::Error;

/// 用于提供错误上下文和用户友好建议
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    pub operation: String,
    pub suggestions: Vec<String>,
}

/// 带有上下文的错误
#[derive(Error, Debug)]
pub struct ContextualError {
    #[source]
    pub error: AppError,
    pub context: ErrorContext,
}

impl std::fmt::Display for ContextualError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "操作失败: {}\n错误: {}", self.context.operation, self.error)
    }
}

impl AppError {
    /// 为错误添加上下文信息，并根据错误类型附带建议
    pub fn with_context(self, operation: &str) -> ContextualError {
        let suggestions = suggestions_for(&self)
            .iter()
            .map(|s| s.to_string())
            .collect();
        ContextualError {
            error: self,
            context: ErrorContext {
                operation: operation.to_string(),
                suggestions,
            },
        }
    }
}

impl ContextualError {
    /// 获取用户友好的错误消息
    pub fn user_message(&self) -> String {
        let mut msg = format!("❌ {}\n", self.context.operation);
        msg.push_str(&format!("原因: {}\n", self.error));

        if !self.context.suggestions.is_empty() {
            msg.push_str("💡 建议:\n");
            for suggestion in &self.context.suggestions {
                msg.push_str(&format!("  • {}\n", suggestion));
            }
        }

        msg
    }
}

fn suggestions_for(error: &AppError) -> &'static [&'static str] {
    match error {
        AppError::LicenseNotAccepted { .. } => &[
            "在配置文件 [license] 中设置 accept = true",
            "确认 title 与目录中的许可标题完全一致",
        ],
        AppError::AuthLoopExceeded { .. } => &[
            "检查 Oracle 账号的用户名和密码",
            "确认账号已完成邮箱验证",
        ],
        AppError::NoSuchVersion { .. } | AppError::NoSuchRelease { .. } => &[
            "运行 `jdk-installer list` 查看目录中的版本",
            "版本格式示例: 7u15, 6u39, 1_5_0_22",
        ],
        AppError::NoSuchPlatform { .. } => &["运行 `jdk-installer platform` 检查目标平台标识"],
        AppError::CatalogSchema { .. } => &["目录格式已变更，需要升级 jdk-installer"],
        _ => &[],
    }
}

/// 为Result添加上下文信息的辅助函数
pub fn with_context<T>(result: AppResult<T>, operation: &str) -> Result<T, ContextualError> {
    result.map_err(|e| e.with_context(operation))
}
