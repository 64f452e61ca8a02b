//! HTML email templates.
//!
//! Every value that originates from a form or an admin edit goes through
//! `escape_html` before it is interpolated into a body. Subjects are plain
//! header text and are not escaped.

use chrono::NaiveDate;

use crate::config::APP_NAME;
use crate::models::{Referral, ReferralStatus};
use crate::rollup::{format_thousands, WeeklyRollup};

const BRAND_NAVY: &str = "#002f60";
const BRAND_ORANGE: &str = "#e47727";
const POSITIVE_GREEN: &str = "#22c55e";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub subject: String,
    pub html_body: String,
}

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(ch),
        }
    }
    out
}

fn date_or_na(date: Option<NaiveDate>) -> String {
    date.map(|d| d.to_string()).unwrap_or_else(|| "N/A".into())
}

/// Referrer-facing explanation of a status.
pub fn status_message(referral: &Referral, status: ReferralStatus) -> String {
    let candidate = escape_html(&referral.candidate_name);
    let bonus = referral.bonus_amount;
    match status {
        ReferralStatus::Submitted => {
            "Your referral has been received and is waiting for review.".to_string()
        }
        ReferralStatus::UnderReview => {
            "Our Talent team is now reviewing your referral.".to_string()
        }
        ReferralStatus::CandidateApplied => {
            format!("{candidate} has applied and is in our system!")
        }
        ReferralStatus::Interviewing => {
            format!("{candidate} is now in the interview process!")
        }
        ReferralStatus::Hired => format!(
            "Great news! {candidate} has been hired! Your ${bonus} bonus will be paid \
             after they complete 60 days."
        ),
        ReferralStatus::Eligible => format!(
            "Your referral bonus of ${bonus} is now eligible for payout! It will be processed soon."
        ),
        ReferralStatus::Paid => format!(
            "Your ${bonus} referral bonus has been added to payroll and is being processed. \
             Thank you for helping us build a great team!"
        ),
        ReferralStatus::NotHired => format!(
            "Unfortunately, {candidate} was not selected for this position. Thank you for your referral."
        ),
        ReferralStatus::Withdrawn => format!(
            "{candidate} has withdrawn or is no longer responsive. Thank you for your referral."
        ),
        ReferralStatus::LeftBeforeSixtyDays => format!(
            "Unfortunately, {candidate} left before completing 60 days. \
             The referral bonus is no longer eligible."
        ),
        ReferralStatus::Ineligible => {
            "This referral has been marked as ineligible. Please contact Talent if you have questions."
                .to_string()
        }
    }
}

/// Renders every notification the program sends.
#[derive(Debug, Clone)]
pub struct EmailTemplates {
    organization: String,
    app_url: String,
}

impl EmailTemplates {
    pub fn new(organization: &str, app_url: &str) -> Self {
        Self {
            organization: organization.to_string(),
            app_url: app_url.trim_end_matches('/').to_string(),
        }
    }

    fn admin_link(&self) -> String {
        format!("{}/?admin=true", escape_html(&self.app_url))
    }

    /// Header banner, body, footer banner.
    fn layout(&self, title: &str, max_width: u32, content: &str) -> String {
        format!(
            r#"<div style="font-family: 'Open Sans', Arial, sans-serif; max-width: {max_width}px; margin: 0 auto;">
  <div style="background-color: {BRAND_NAVY}; padding: 20px; text-align: center;">
    <h1 style="color: white; margin: 0;">{title}</h1>
  </div>
  <div style="padding: 30px; background-color: #f8f9fa;">
{content}
  </div>
  <div style="background-color: {BRAND_NAVY}; padding: 15px; text-align: center;">
    <p style="color: white; margin: 0; font-size: 0.9em;">{org}</p>
  </div>
</div>"#,
            org = escape_html(&self.organization),
        )
    }

    pub fn referral_confirmation(&self, referral: &Referral) -> RenderedEmail {
        let referrer = escape_html(&referral.referrer_name);
        let candidate = escape_html(&referral.candidate_name);
        let position = escape_html(&referral.position);
        let id = escape_html(&referral.referral_id);
        let bonus = referral.bonus_amount;

        let content = format!(
            r#"    <h2 style="color: {BRAND_NAVY};">Thank you for your referral!</h2>
    <p>Hi {referrer},</p>
    <p>We've received your referral for <strong>{candidate}</strong> for the <strong>{position}</strong> position.</p>
    <div style="background-color: white; border-radius: 8px; padding: 20px; margin: 20px 0;">
      <p style="margin: 5px 0;"><strong>Referral ID:</strong> {id}</p>
      <p style="margin: 5px 0;"><strong>Candidate:</strong> {candidate}</p>
      <p style="margin: 5px 0;"><strong>Position:</strong> {position}</p>
      <p style="margin: 5px 0;"><strong>Potential Bonus:</strong> <span style="color: {BRAND_ORANGE}; font-size: 1.2em;">${bonus}</span></p>
    </div>
    <p><strong>What's next?</strong></p>
    <ul>
      <li>Make sure {candidate} applies and lists you as their referrer</li>
      <li>Our Talent team will review the application</li>
      <li>You'll receive updates as the process moves forward</li>
      <li>If hired, your bonus will be paid after they complete 60 days</li>
    </ul>
    <p>You can check your referral status anytime at the {APP_NAME} portal.</p>
    <p style="color: #666; font-size: 0.9em; margin-top: 30px;">Questions? Reply to this email or contact the Talent team.</p>"#
        );

        RenderedEmail {
            subject: format!("Referral Submitted - {}", referral.candidate_name),
            html_body: self.layout(APP_NAME, 600, &content),
        }
    }

    pub fn new_referral_alert(&self, referral: &Referral) -> RenderedEmail {
        let phone = if referral.candidate_phone.trim().is_empty() {
            "Not provided".to_string()
        } else {
            escape_html(&referral.candidate_phone)
        };
        let role_fit = if referral.role_fit.trim().is_empty() {
            String::new()
        } else {
            format!(
                r#"
      <p style="margin: 5px 0;"><strong>Role Fit:</strong> {}</p>"#,
                escape_html(&referral.role_fit)
            )
        };
        let notes = if referral.notes.trim().is_empty() {
            String::new()
        } else {
            format!(
                "\n    <p><strong>Notes:</strong> {}</p>",
                escape_html(&referral.notes)
            )
        };

        let content = format!(
            r#"    <h2 style="color: {BRAND_ORANGE};">New referral submitted!</h2>
    <div style="background-color: white; border-radius: 8px; padding: 20px; margin: 20px 0;">
      <h3 style="color: {BRAND_NAVY}; margin-top: 0;">Candidate Information</h3>
      <p style="margin: 5px 0;"><strong>Name:</strong> {candidate}</p>
      <p style="margin: 5px 0;"><strong>Email:</strong> {candidate_email}</p>
      <p style="margin: 5px 0;"><strong>Phone:</strong> {phone}</p>
      <p style="margin: 5px 0;"><strong>Position:</strong> {position} ({position_type})</p>
      <p style="margin: 5px 0;"><strong>Already Applied:</strong> {already_applied}</p>{role_fit}
    </div>
    <div style="background-color: white; border-radius: 8px; padding: 20px; margin: 20px 0;">
      <h3 style="color: {BRAND_NAVY}; margin-top: 0;">Referrer Information</h3>
      <p style="margin: 5px 0;"><strong>Name:</strong> {referrer}</p>
      <p style="margin: 5px 0;"><strong>Email:</strong> {referrer_email}</p>
      <p style="margin: 5px 0;"><strong>School:</strong> {school}</p>
      <p style="margin: 5px 0;"><strong>Relationship:</strong> {relationship}</p>
    </div>
    <div style="background-color: #fff3cd; border-radius: 8px; padding: 15px; margin: 20px 0;">
      <p style="margin: 0;"><strong>Referral ID:</strong> {id}</p>
      <p style="margin: 5px 0 0 0;"><strong>Bonus Amount:</strong> ${bonus}</p>
    </div>{notes}"#,
            candidate = escape_html(&referral.candidate_name),
            candidate_email = escape_html(&referral.candidate_email),
            position = escape_html(&referral.position),
            position_type = escape_html(&referral.position_type),
            already_applied = escape_html(&referral.already_applied),
            referrer = escape_html(&referral.referrer_name),
            referrer_email = escape_html(&referral.referrer_email),
            school = escape_html(&referral.referrer_school),
            relationship = escape_html(&referral.relationship),
            id = escape_html(&referral.referral_id),
            bonus = referral.bonus_amount,
        );

        RenderedEmail {
            subject: format!(
                "New Referral: {} for {}",
                referral.candidate_name, referral.position
            ),
            html_body: self.layout("New Staff Referral", 600, &content),
        }
    }

    /// `referral` reflects the update; `status` is the new status.
    pub fn status_update(&self, referral: &Referral, status: ReferralStatus) -> RenderedEmail {
        let color = status.tone().color();
        let label = status.display_label();
        let message = status_message(referral, status);

        let content = format!(
            r#"    <p>Hi {referrer},</p>
    <div style="background-color: white; border-radius: 8px; padding: 20px; margin: 20px 0; text-align: center;">
      <p style="margin: 0 0 10px 0;">Your referral for <strong>{candidate}</strong></p>
      <p style="font-size: 1.5em; color: {color}; margin: 0; font-weight: bold;">{label}</p>
    </div>
    <p>{message}</p>
    <div style="background-color: white; border-radius: 8px; padding: 15px; margin: 20px 0;">
      <p style="margin: 5px 0;"><strong>Referral ID:</strong> {id}</p>
      <p style="margin: 5px 0;"><strong>Position:</strong> {position}</p>
      <p style="margin: 5px 0;"><strong>Potential Bonus:</strong> ${bonus}</p>
    </div>
    <p style="color: #666; font-size: 0.9em; margin-top: 30px;">Questions? Reply to this email or contact the Talent team.</p>"#,
            referrer = escape_html(&referral.referrer_name),
            candidate = escape_html(&referral.candidate_name),
            id = escape_html(&referral.referral_id),
            position = escape_html(&referral.position),
            bonus = referral.bonus_amount,
        );

        RenderedEmail {
            subject: format!("Referral Update: {} - {}", referral.candidate_name, status),
            html_body: self.layout("Referral Status Update", 600, &content),
        }
    }

    pub fn payout_alert(&self, referral: &Referral) -> RenderedEmail {
        let payout_month = referral
            .payout_month
            .as_deref()
            .map(escape_html)
            .unwrap_or_else(|| "N/A".into());

        let content = format!(
            r#"    <h2 style="color: {POSITIVE_GREEN};">Ready for Payout!</h2>
    <p>A referral bonus is now eligible for payment:</p>
    <div style="background-color: white; border-radius: 8px; padding: 20px; margin: 20px 0;">
      <h3 style="color: {BRAND_NAVY}; margin-top: 0;">Payout Details</h3>
      <p style="margin: 5px 0;"><strong>Amount:</strong> <span style="color: {POSITIVE_GREEN}; font-size: 1.3em; font-weight: bold;">${bonus}</span></p>
      <p style="margin: 5px 0;"><strong>Pay To:</strong> {referrer}</p>
      <p style="margin: 5px 0;"><strong>Referrer Email:</strong> {referrer_email}</p>
      <p style="margin: 5px 0;"><strong>School/Dept:</strong> {school}</p>
    </div>
    <div style="background-color: white; border-radius: 8px; padding: 20px; margin: 20px 0;">
      <h3 style="color: {BRAND_NAVY}; margin-top: 0;">Hired Candidate</h3>
      <p style="margin: 5px 0;"><strong>Name:</strong> {candidate}</p>
      <p style="margin: 5px 0;"><strong>Position:</strong> {position}</p>
      <p style="margin: 5px 0;"><strong>Hire Date:</strong> {hire_date}</p>
      <p style="margin: 5px 0;"><strong>60-Day Completion:</strong> {sixty_day}</p>
    </div>
    <div style="background-color: #fff3cd; border-radius: 8px; padding: 15px; margin: 20px 0;">
      <p style="margin: 0;"><strong>Referral ID:</strong> {id}</p>
      <p style="margin: 5px 0 0 0;"><strong>Scheduled Payout:</strong> {payout_month}</p>
    </div>
    <p>Once the payout has been processed, please update the status to <strong>"Paid"</strong> using the link below:</p>
    <p style="text-align: center; margin: 25px 0;">
      <a href="{link}" style="background: {POSITIVE_GREEN}; color: white; padding: 14px 30px; text-decoration: none; border-radius: 8px; display: inline-block; font-weight: bold; font-size: 1.1em;">Update Status to Paid</a>
    </p>"#,
            bonus = referral.bonus_amount,
            referrer = escape_html(&referral.referrer_name),
            referrer_email = escape_html(&referral.referrer_email),
            school = escape_html(&referral.referrer_school),
            candidate = escape_html(&referral.candidate_name),
            position = escape_html(&referral.position),
            hire_date = date_or_na(referral.hire_date),
            sixty_day = date_or_na(referral.sixty_day_date),
            id = escape_html(&referral.referral_id),
            link = self.admin_link(),
        );

        RenderedEmail {
            subject: format!(
                "Referral Bonus Ready for Payout: {} - ${}",
                referral.candidate_name, referral.bonus_amount
            ),
            html_body: self.layout("Referral Bonus Payout", 600, &content),
        }
    }

    pub fn weekly_rollup(&self, rollup: &WeeklyRollup) -> RenderedEmail {
        let stat = |value: String, label: &str, color: &str| {
            format!(
                r#"      <div style="background: white; padding: 15px 20px; border-radius: 8px; flex: 1; min-width: 120px; text-align: center;">
        <div style="font-size: 2em; font-weight: bold; color: {color};">{value}</div>
        <div style="color: #666; font-size: 0.9em;">{label}</div>
      </div>"#
            )
        };
        let stats = [
            stat(rollup.total_referrals.to_string(), "Total Referrals", BRAND_NAVY),
            stat(rollup.needs_review.len().to_string(), "Need Review", "#f97316"),
            stat(rollup.ready_for_payout.len().to_string(), "Ready for Payout", POSITIVE_GREEN),
            stat(
                format!("${}", format_thousands(rollup.pending_bonus_total)),
                "Pending Bonuses",
                POSITIVE_GREEN,
            ),
        ]
        .join("\n");

        let sections = [
            rollup_table("New This Week", &rollup.new_this_week, "#f97316"),
            rollup_table("Needs Review", &rollup.needs_review, "#ef4444"),
            rollup_table("60-Day Completion Coming Up", &rollup.upcoming_sixty_day, "#8b5cf6"),
            rollup_table("Ready for Payout", &rollup.ready_for_payout, POSITIVE_GREEN),
            rollup_table("Currently Interviewing", &rollup.interviewing, "#3b82f6"),
            rollup_table("Hired - Waiting for 60 Days", &rollup.hired_waiting, "#6b7280"),
        ]
        .concat();

        let actions: String = rollup
            .action_items()
            .iter()
            .map(|item| format!("\n        <li>{}</li>", escape_html(item)))
            .collect();

        let content = format!(
            r#"    <p style="color: {BRAND_ORANGE}; margin: 0 0 20px 0; text-align: center;">Weekly Summary</p>
    <div style="display: flex; gap: 15px; margin-bottom: 25px; flex-wrap: wrap;">
{stats}
    </div>{sections}
    <div style="margin-top: 30px; padding: 15px; background: #fff3cd; border-radius: 8px;">
      <p style="margin: 0;"><strong>Action Items:</strong></p>
      <ul style="margin: 10px 0 0 0; padding-left: 20px;">{actions}
      </ul>
    </div>
    <p style="text-align: center; margin-top: 25px;">
      <a href="{link}" style="background: {BRAND_NAVY}; color: white; padding: 12px 25px; text-decoration: none; border-radius: 5px; display: inline-block;">Open Admin Dashboard</a>
    </p>"#,
            link = self.admin_link(),
        );

        RenderedEmail {
            subject: format!(
                "{APP_NAME} - Weekly Summary ({})",
                rollup.generated_at.format("%B %d, %Y")
            ),
            html_body: self.layout(APP_NAME, 800, &content),
        }
    }
}

/// One digest section; empty buckets render nothing.
fn rollup_table(title: &str, referrals: &[Referral], color: &str) -> String {
    if referrals.is_empty() {
        return String::new();
    }
    let rows: String = referrals
        .iter()
        .map(|r| {
            format!(
                r#"
          <tr>
            <td style="padding: 8px; border-bottom: 1px solid #eee;">{}</td>
            <td style="padding: 8px; border-bottom: 1px solid #eee;">{}</td>
            <td style="padding: 8px; border-bottom: 1px solid #eee;">{}</td>
            <td style="padding: 8px; border-bottom: 1px solid #eee;">${}</td>
          </tr>"#,
                escape_html(&r.candidate_name),
                escape_html(&r.position),
                escape_html(&r.referrer_name),
                r.bonus_amount,
            )
        })
        .collect();

    format!(
        r#"
    <div style="margin: 20px 0;">
      <h3 style="color: {color}; margin-bottom: 10px;">{title} ({count})</h3>
      <table style="width: 100%; border-collapse: collapse; background: white; border-radius: 8px;">
        <thead>
          <tr style="background: #f8f9fa;">
            <th style="padding: 10px; text-align: left;">Candidate</th>
            <th style="padding: 10px; text-align: left;">Position</th>
            <th style="padding: 10px; text-align: left;">Referrer</th>
            <th style="padding: 10px; text-align: left;">Bonus</th>
          </tr>
        </thead>
        <tbody>{rows}
        </tbody>
      </table>
    </div>"#,
        count = referrals.len(),
    )
}
