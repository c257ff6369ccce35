//! CSV exports. Fields are quoted per RFC 4180 when they contain a comma,
//! quote, CR or LF; embedded quotes are doubled. Rows end with CRLF.

use std::borrow::Cow;

use chrono::NaiveDate;
use db::models::{payment::PaymentWithTenant, tenant::TenantWithUnit};
use utils::money::format_centavos;

const TENANT_HEADER: [&str; 9] = [
    "Name",
    "Email",
    "Contact Number",
    "Branch",
    "Unit",
    "Monthly Rent",
    "Contract Start",
    "Contract End",
    "Status",
];

const PAYMENT_HEADER: [&str; 8] = [
    "Payment Date",
    "Tenant",
    "Unit",
    "Branch",
    "Amount",
    "Mode",
    "Status",
    "Notes",
];

pub fn escape_field(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\r', '\n']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

fn push_row<I, S>(out: &mut String, fields: I)
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    for (i, field) in fields.into_iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&escape_field(field.as_ref()));
    }
    out.push_str("\r\n");
}

fn date_or_blank(date: Option<NaiveDate>) -> String {
    date.map(|d| d.to_string()).unwrap_or_default()
}

pub fn tenants_csv(rows: &[TenantWithUnit]) -> String {
    let mut out = String::new();
    push_row(&mut out, TENANT_HEADER);
    for row in rows {
        push_row(
            &mut out,
            [
                row.full_name(),
                row.email.clone(),
                row.contact_number.clone(),
                row.branch.clone(),
                row.unit_number.clone().unwrap_or_default(),
                row.monthly_rent_cents.map(format_centavos).unwrap_or_default(),
                date_or_blank(row.contract_start_date),
                date_or_blank(row.contract_end_date),
                row.status.to_string(),
            ],
        );
    }
    out
}

pub fn payments_csv(rows: &[PaymentWithTenant]) -> String {
    let mut out = String::new();
    push_row(&mut out, PAYMENT_HEADER);
    for row in rows {
        let payment = &row.payment;
        push_row(
            &mut out,
            [
                payment.payment_date.to_string(),
                row.tenant_name(),
                row.unit_number.clone().unwrap_or_default(),
                row.branch.clone(),
                format_centavos(payment.amount_cents),
                payment.payment_mode.to_string(),
                payment.status.to_string(),
                payment.notes.clone().unwrap_or_default(),
            ],
        );
    }
    out
}

/// `tenants-2025-03-01.csv`
pub fn report_file_name(kind: &str, date: NaiveDate) -> String {
    format!("{kind}-{}.csv", date.format("%Y-%m-%d"))
}
