//! Notification templates and dispatch.
//!
//! Sending persists exactly one notification row per resolved recipient,
//! then attempts each requested channel. Channel failures are counted in the
//! returned summary and never undo the stored rows.

use std::{collections::HashSet, sync::Arc};

use chrono::NaiveDate;
use db::models::{
    notification::{CreateNotification, DeliveryMethod, Notification, NotificationType},
    notification_template::{
        CreateNotificationTemplate, NotificationTemplate, UpdateNotificationTemplate,
    },
    payment::Payment,
    tenant::{Tenant, TenantWithUnit},
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{info, warn};
use ts_rs::TS;
use utils::{
    money::format_centavos,
    validation::{is_valid_email, non_blank},
};
use uuid::Uuid;

use super::{
    access::{AccessError, BranchScope},
    delivery::{EmailMessage, EmailSender, SmsMessage, SmsSender},
    ledger::{due_date_for, overdue_balance},
};

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("Notification not found")]
    NotFound,
    #[error("Template not found")]
    TemplateNotFound,
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Values substituted into `{{placeholder}}` fields.
#[derive(Debug, Clone, Default)]
pub struct RenderContext {
    pub tenant_name: String,
    pub first_name: String,
    pub unit_number: Option<String>,
    pub branch: String,
    pub amount_due_cents: Option<i64>,
    pub due_date: Option<NaiveDate>,
}

/// Plain placeholder replacement. Unknown placeholders are left untouched;
/// known ones without a value render empty.
pub fn render(text: &str, ctx: &RenderContext) -> String {
    let amount_due = ctx
        .amount_due_cents
        .map(|cents| format!("₱{}", format_centavos(cents)))
        .unwrap_or_default();
    let due_date = ctx
        .due_date
        .map(|d| d.format("%B %-d, %Y").to_string())
        .unwrap_or_default();

    [
        ("{{tenant_name}}", ctx.tenant_name.as_str()),
        ("{{first_name}}", ctx.first_name.as_str()),
        ("{{unit_number}}", ctx.unit_number.as_deref().unwrap_or_default()),
        ("{{branch}}", ctx.branch.as_str()),
        ("{{amount_due}}", amount_due.as_str()),
        ("{{due_date}}", due_date.as_str()),
    ]
    .into_iter()
    .fold(text.to_string(), |acc, (placeholder, value)| acc.replace(placeholder, value))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
pub struct SelectedRecipient {
    pub name: String,
    pub unit_number: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(tag = "kind", content = "tenants", rename_all = "snake_case")]
pub enum Recipients {
    AllTenants,
    Selected(Vec<SelectedRecipient>),
}

#[derive(Debug, Clone, Deserialize, TS)]
pub struct SendNotification {
    /// Required for super admins
    pub branch: Option<String>,
    pub recipients: Recipients,
    #[serde(default)]
    pub notification_type: NotificationType,
    pub delivery_method: DeliveryMethod,
    /// Fills subject and message when those are omitted
    pub template_id: Option<Uuid>,
    pub subject: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
pub struct SkippedChannel {
    pub tenant_id: Uuid,
    pub channel: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize, TS)]
pub struct DispatchSummary {
    pub recipients: usize,
    pub notifications_created: usize,
    pub email_sent: usize,
    pub email_failed: usize,
    pub sms_sent: usize,
    pub sms_failed: usize,
    pub skipped: Vec<SkippedChannel>,
    pub unmatched: Vec<SelectedRecipient>,
}

/// Match selections against a branch's active tenants by full name and
/// unit number, ignoring case. Each tenant is resolved at most once.
pub fn resolve_selected(
    tenants: Vec<TenantWithUnit>,
    selected: &[SelectedRecipient],
) -> (Vec<TenantWithUnit>, Vec<SelectedRecipient>) {
    let mut seen = HashSet::new();
    let mut resolved = Vec::new();
    let mut unmatched = Vec::new();

    for selection in selected {
        let name = selection.name.trim();
        let unit = selection.unit_number.trim();
        let found = tenants.iter().find(|t| {
            t.full_name().eq_ignore_ascii_case(name)
                && t.unit_number
                    .as_deref()
                    .is_some_and(|u| u.trim().eq_ignore_ascii_case(unit))
        });
        match found {
            Some(tenant) => {
                if seen.insert(tenant.id) {
                    resolved.push(tenant.clone());
                }
            }
            None => unmatched.push(selection.clone()),
        }
    }
    (resolved, unmatched)
}

#[derive(Clone)]
pub struct NotificationService {
    pool: SqlitePool,
    email: Arc<dyn EmailSender>,
    sms: Arc<dyn SmsSender>,
    due_day: u32,
}

impl NotificationService {
    pub fn new(
        pool: SqlitePool,
        email: Arc<dyn EmailSender>,
        sms: Arc<dyn SmsSender>,
        due_day: u32,
    ) -> Self {
        Self {
            pool,
            email,
            sms,
            due_day,
        }
    }

    // Templates

    pub async fn list_templates(
        &self,
        scope: &BranchScope,
    ) -> Result<Vec<NotificationTemplate>, NotificationError> {
        Ok(NotificationTemplate::list_for_branch(&self.pool, scope.filter()).await?)
    }

    /// Managers always create templates for their own branch; super admins
    /// may leave the branch empty to share a template with every branch.
    pub async fn create_template(
        &self,
        scope: &BranchScope,
        mut data: CreateNotificationTemplate,
    ) -> Result<NotificationTemplate, NotificationError> {
        for (field, value) in [("Name", &data.name), ("Subject", &data.subject), ("Message", &data.message)] {
            if non_blank(value).is_none() {
                return Err(NotificationError::Validation(format!("{field} is required")));
            }
        }
        data.branch = match scope {
            BranchScope::All => data.branch.as_deref().and_then(non_blank).map(str::to_string),
            BranchScope::Branch(_) => Some(scope.resolve(data.branch.as_deref())?),
        };

        let template = NotificationTemplate::create(&self.pool, Uuid::new_v4(), &data).await?;
        info!(template_id = %template.id, branch = ?template.branch, "Notification template created");
        Ok(template)
    }

    async fn find_template_for_edit(
        &self,
        scope: &BranchScope,
        id: Uuid,
    ) -> Result<NotificationTemplate, NotificationError> {
        let template = NotificationTemplate::find_by_id(&self.pool, id)
            .await?
            .ok_or(NotificationError::TemplateNotFound)?;
        match (&template.branch, scope) {
            (_, BranchScope::All) => {}
            (None, BranchScope::Branch(_)) => return Err(AccessError::Forbidden.into()),
            (Some(branch), scope) => scope.ensure(branch)?,
        }
        Ok(template)
    }

    pub async fn update_template(
        &self,
        scope: &BranchScope,
        id: Uuid,
        data: UpdateNotificationTemplate,
    ) -> Result<NotificationTemplate, NotificationError> {
        self.find_template_for_edit(scope, id).await?;
        NotificationTemplate::update(&self.pool, id, &data)
            .await?
            .ok_or(NotificationError::TemplateNotFound)
    }

    pub async fn delete_template(&self, scope: &BranchScope, id: Uuid) -> Result<(), NotificationError> {
        self.find_template_for_edit(scope, id).await?;
        NotificationTemplate::delete(&self.pool, id).await?;
        Ok(())
    }

    // Dispatch

    async fn resolve_content(
        &self,
        scope: &BranchScope,
        request: &SendNotification,
    ) -> Result<(String, String), NotificationError> {
        let template = match request.template_id {
            Some(id) => {
                let template = NotificationTemplate::find_by_id(&self.pool, id)
                    .await?
                    .ok_or(NotificationError::TemplateNotFound)?;
                if let Some(branch) = &template.branch {
                    scope.ensure(branch)?;
                }
                Some(template)
            }
            None => None,
        };

        let pick = |explicit: &Option<String>, from_template: Option<&String>| {
            explicit
                .as_deref()
                .and_then(non_blank)
                .map(str::to_string)
                .or_else(|| from_template.cloned())
        };
        let subject = pick(&request.subject, template.as_ref().map(|t| &t.subject))
            .ok_or_else(|| NotificationError::Validation("Subject is required".into()))?;
        let message = pick(&request.message, template.as_ref().map(|t| &t.message))
            .ok_or_else(|| NotificationError::Validation("Message is required".into()))?;
        Ok((subject, message))
    }

    async fn render_context(
        &self,
        tenant: &TenantWithUnit,
        needs_balance: bool,
        today: NaiveDate,
    ) -> Result<RenderContext, NotificationError> {
        let amount_due_cents = match (needs_balance, tenant.contract_start_date, tenant.monthly_rent_cents) {
            (true, Some(start), Some(rent)) => {
                let paid = Payment::confirmed_dates_for_tenant(&self.pool, tenant.id).await?;
                Some(overdue_balance(start, rent, &paid, today, self.due_day).total_cents)
            }
            _ => None,
        };
        Ok(RenderContext {
            tenant_name: tenant.full_name(),
            first_name: tenant.first_name.clone(),
            unit_number: tenant.unit_number.clone(),
            branch: tenant.branch.clone(),
            amount_due_cents,
            due_date: Some(due_date_for(today, self.due_day)),
        })
    }

    pub async fn send(
        &self,
        scope: &BranchScope,
        sent_by: Uuid,
        request: SendNotification,
        today: NaiveDate,
    ) -> Result<DispatchSummary, NotificationError> {
        let branch = scope.resolve(request.branch.as_deref())?;
        let (subject, message) = self.resolve_content(scope, &request).await?;

        let tenants = Tenant::list_active_with_unit(&self.pool, &branch).await?;
        let (recipients, unmatched) = match &request.recipients {
            Recipients::AllTenants => (tenants, Vec::new()),
            Recipients::Selected(selected) => {
                if selected.is_empty() {
                    return Err(NotificationError::Validation(
                        "Select at least one recipient".into(),
                    ));
                }
                resolve_selected(tenants, selected)
            }
        };

        let needs_balance = subject.contains("{{amount_due}}") || message.contains("{{amount_due}}");
        let mut rendered = Vec::with_capacity(recipients.len());
        for tenant in &recipients {
            let ctx = self.render_context(tenant, needs_balance, today).await?;
            rendered.push((render(&subject, &ctx), render(&message, &ctx)));
        }

        let mut tx = self.pool.begin().await?;
        for (tenant, (subject, message)) in recipients.iter().zip(&rendered) {
            Notification::create(
                &mut *tx,
                Uuid::new_v4(),
                &CreateNotification {
                    tenant_id: tenant.id,
                    notification_type: request.notification_type,
                    subject,
                    message,
                    delivery_method: request.delivery_method,
                    sent_by: Some(sent_by),
                },
            )
            .await?;
        }
        tx.commit().await?;

        let mut summary = DispatchSummary {
            recipients: recipients.len(),
            notifications_created: recipients.len(),
            unmatched,
            ..Default::default()
        };

        for (tenant, (subject, message)) in recipients.iter().zip(rendered) {
            self.deliver(tenant, request.delivery_method, subject, message, &mut summary)
                .await;
        }

        info!(
            branch = %branch,
            recipients = summary.recipients,
            email_sent = summary.email_sent,
            email_failed = summary.email_failed,
            sms_failed = summary.sms_failed,
            unmatched = summary.unmatched.len(),
            "Notifications dispatched"
        );
        Ok(summary)
    }

    async fn deliver(
        &self,
        tenant: &TenantWithUnit,
        method: DeliveryMethod,
        subject: String,
        message: String,
        summary: &mut DispatchSummary,
    ) {
        let skip = |channel: &str, reason: &str| SkippedChannel {
            tenant_id: tenant.id,
            channel: channel.to_string(),
            reason: reason.to_string(),
        };

        if method.includes_email() {
            if is_valid_email(&tenant.email) {
                let email = EmailMessage {
                    to: tenant.email.trim().to_string(),
                    subject,
                    message: message.clone(),
                };
                match self.email.send_email(&email).await {
                    Ok(()) => summary.email_sent += 1,
                    Err(e) => {
                        warn!(tenant_id = %tenant.id, error = %e, "E-mail delivery failed");
                        summary.email_failed += 1;
                    }
                }
            } else {
                summary.skipped.push(skip("email", "invalid email address"));
            }
        }

        if method.includes_sms() {
            match non_blank(&tenant.contact_number) {
                Some(number) => {
                    let sms = SmsMessage {
                        to: number.to_string(),
                        message,
                    };
                    match self.sms.send_sms(&sms).await {
                        Ok(()) => summary.sms_sent += 1,
                        Err(e) => {
                            warn!(tenant_id = %tenant.id, error = %e, "SMS delivery failed");
                            summary.sms_failed += 1;
                        }
                    }
                }
                None => summary.skipped.push(skip("sms", "no contact number")),
            }
        }
    }

    // Tenant side

    pub async fn list_for_tenant(&self, tenant_id: Uuid) -> Result<Vec<Notification>, NotificationError> {
        Ok(Notification::list_by_tenant(&self.pool, tenant_id).await?)
    }

    pub async fn mark_read(&self, tenant_id: Uuid, id: Uuid) -> Result<Notification, NotificationError> {
        Notification::mark_read(&self.pool, id, tenant_id)
            .await?
            .ok_or(NotificationError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use db::DBService;

    use super::*;
    use crate::services::{
        delivery::UnimplementedSms,
        occupancy::OccupancyService,
        test_support::{RecordingEmail, date, seed_tenant, seed_unit},
    };

    fn ctx() -> RenderContext {
        RenderContext {
            tenant_name: "Ana Cruz".into(),
            first_name: "Ana".into(),
            unit_number: Some("101".into()),
            branch: "cainta".into(),
            amount_due_cents: Some(1_700_000),
            due_date: Some(date(2025, 3, 15)),
        }
    }

    #[test]
    fn render_replaces_known_placeholders_only() {
        let out = render(
            "Hi {{first_name}} of unit {{unit_number}}: {{amount_due}} due {{due_date}}. {{unknown}}",
            &ctx(),
        );
        assert_eq!(out, "Hi Ana of unit 101: ₱17,000.00 due March 15, 2025. {{unknown}}");
    }

    #[test]
    fn selections_match_name_and_unit_case_insensitively() {
        let tenant = |first: &str, unit: &str| TenantWithUnit {
            tenant: Tenant {
                id: Uuid::new_v4(),
                profile_id: None,
                first_name: first.into(),
                last_name: "Cruz".into(),
                email: format!("{first}@example.com"),
                contact_number: "09170000000".into(),
                branch: "cainta".into(),
                occupation: None,
                emergency_contact_name: None,
                emergency_contact_number: None,
                valid_id_document_id: None,
                status: Default::default(),
                created_at: chrono::Utc::now(),
                updated_at: chrono::Utc::now(),
            },
            contract_id: None,
            contract_start_date: None,
            contract_end_date: None,
            unit_id: None,
            unit_number: Some(unit.into()),
            monthly_rent_cents: None,
        };
        let tenants = vec![tenant("Ana", "101"), tenant("Ben", "102")];
        let selected = vec![
            SelectedRecipient {
                name: "ana cruz".into(),
                unit_number: "101".into(),
            },
            SelectedRecipient {
                name: "ANA CRUZ".into(),
                unit_number: "101".into(),
            },
            SelectedRecipient {
                name: "Ben Cruz".into(),
                unit_number: "999".into(),
            },
        ];
        let (resolved, unmatched) = resolve_selected(tenants, &selected);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].first_name, "Ana");
        assert_eq!(unmatched.len(), 1);
        assert_eq!(unmatched[0].unit_number, "999");
    }

    #[tokio::test]
    async fn send_creates_one_row_per_recipient_and_counts_channels() {
        let db = DBService::new_in_memory().await.unwrap();
        let ana = seed_tenant(&db.pool, "ana@example.com", "cainta").await;
        let ben = seed_tenant(&db.pool, "ben@example.com", "cainta").await;
        seed_tenant(&db.pool, "cora@example.com", "cubao").await;
        let occupancy = OccupancyService::new(db.pool.clone());
        for (tenant, number) in [(&ana, "101"), (&ben, "102")] {
            let unit = seed_unit(&db.pool, number, "cainta", 850_000).await;
            occupancy
                .assign_unit(tenant.id, unit.id, date(2025, 1, 1), date(2025, 12, 31))
                .await
                .unwrap();
        }

        let email = RecordingEmail {
            failing: vec!["ben@example.com".into()],
            ..Default::default()
        };
        let service = NotificationService::new(
            db.pool.clone(),
            Arc::new(email.clone()),
            Arc::new(UnimplementedSms),
            15,
        );
        let scope = BranchScope::Branch("cainta".into());

        let summary = service
            .send(
                &scope,
                Uuid::new_v4(),
                SendNotification {
                    branch: None,
                    recipients: Recipients::AllTenants,
                    notification_type: NotificationType::PaymentReminder,
                    delivery_method: DeliveryMethod::SmsAndEmail,
                    template_id: None,
                    subject: Some("Rent for unit {{unit_number}}".into()),
                    message: Some("Dear {{tenant_name}}, you owe {{amount_due}}.".into()),
                },
                date(2025, 2, 20),
            )
            .await
            .unwrap();

        assert_eq!(summary.recipients, 2);
        assert_eq!(summary.notifications_created, 2);
        assert_eq!(summary.email_sent, 1);
        assert_eq!(summary.email_failed, 1);
        assert_eq!(summary.sms_sent, 0);
        assert_eq!(summary.sms_failed, 2);

        let stored = service.list_for_tenant(ana.id).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].subject, "Rent for unit 101");
        assert_eq!(stored[0].message, "Dear Ana Cruz, you owe ₱17,000.00.");

        let sent = email.sent.lock().unwrap().clone();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "ana@example.com");

        let read = service.mark_read(ana.id, stored[0].id).await.unwrap();
        assert!(read.read_at.is_some());
        assert!(matches!(
            service.mark_read(ben.id, stored[0].id).await,
            Err(NotificationError::NotFound)
        ));
    }

    #[tokio::test]
    async fn managers_cannot_edit_global_templates() {
        let db = DBService::new_in_memory().await.unwrap();
        let service = NotificationService::new(
            db.pool.clone(),
            Arc::new(RecordingEmail::default()),
            Arc::new(UnimplementedSms),
            15,
        );
        let template = |branch: Option<&str>| CreateNotificationTemplate {
            name: "Reminder".into(),
            notification_type: NotificationType::PaymentReminder,
            subject: "Rent due".into(),
            message: "Hi {{first_name}}".into(),
            branch: branch.map(str::to_string),
        };

        let global = service
            .create_template(&BranchScope::All, template(None))
            .await
            .unwrap();
        assert_eq!(global.branch, None);

        let manager = BranchScope::Branch("cainta".into());
        let own = service.create_template(&manager, template(None)).await.unwrap();
        assert_eq!(own.branch.as_deref(), Some("cainta"));

        assert_eq!(service.list_templates(&manager).await.unwrap().len(), 2);
        assert!(matches!(
            service.delete_template(&manager, global.id).await,
            Err(NotificationError::Access(AccessError::Forbidden))
        ));
        service.delete_template(&manager, own.id).await.unwrap();
    }
}
