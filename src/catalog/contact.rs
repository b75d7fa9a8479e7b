use log::info;
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use super::model::{CatalogError, ContactMessage, MessageStatus};
use super::Catalog;
use crate::store::{decode, decode_all, Filter, Order, Table};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ContactForm {
    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"))]
    pub name: String,
    #[validate(email(message = "Please enter a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, max = 5000, message = "Message must be between 1 and 5000 characters"))]
    pub message: String,
}

impl ContactForm {
    fn trimmed(&self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            message: self.message.trim().to_string(),
        }
    }
}

/// 取第一条校验错误作为提示
pub(super) fn first_error(errors: &validator::ValidationErrors) -> String {
    errors
        .field_errors()
        .into_iter()
        .flat_map(|(_, errs)| errs.iter())
        .find_map(|e| e.message.as_ref().map(|m| m.to_string()))
        .unwrap_or_else(|| "Invalid input".to_string())
}

impl Catalog {
    pub async fn submit_contact(&self, form: &ContactForm) -> Result<ContactMessage, CatalogError> {
        let form = form.trimmed();
        form.validate()
            .map_err(|e| CatalogError::Validation(first_error(&e)))?;

        let row = self
            .store
            .insert(
                Table::ContactMessages,
                json!({
                    "name": form.name,
                    "email": form.email,
                    "message": form.message,
                    "status": MessageStatus::Unread.as_str(),
                }),
            )
            .await?;
        info!("收到留言: {}", form.email);
        Ok(decode(row)?)
    }

    /// 最新的排在前面
    pub async fn messages(&self) -> Result<Vec<ContactMessage>, CatalogError> {
        let rows = self
            .store
            .select(
                Table::ContactMessages,
                &Filter::all(),
                Some(&Order::desc("created_at")),
                None,
            )
            .await?;
        Ok(decode_all(rows)?)
    }

    pub async fn set_message_status(
        &self,
        id: &str,
        status: MessageStatus,
    ) -> Result<(), CatalogError> {
        self.store
            .update(
                Table::ContactMessages,
                id,
                json!({ "status": status.as_str() }),
            )
            .await?;
        Ok(())
    }
}
