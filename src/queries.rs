//! The declarative queries sent to the page-query service, with the typed
//! shapes their responses deserialize into.

use serde::Deserialize;

use crate::types::JobPost;

pub const EMAIL_QUERY: &str = r#"
{
    login_form {
        email_input
        continue_btn
    }
}
"#;

pub const VERIFY_QUERY: &str = r#"
{
    login_form {
        verify_not_robot_checkbox
    }
}
"#;

pub const PASSWORD_QUERY: &str = r#"
{
    login_form {
        password_input
        continue_btn
    }
}
"#;

pub const JOB_POSTS_QUERY: &str = r#"
{
    job_posts[] {
        org_name
        job_title
        salary
        location
        contract_type(Contract or Full-time)
        location_type(remote or on-site or hybrid)
        date_posted
        url
    }
}
"#;

pub const PAGINATION_QUERY: &str = r#"
{
    pagination {
        next_page_btn
    }
}
"#;

/// A located element, addressed by the CSS selector the service resolved
/// the description to.
#[derive(Debug, Deserialize)]
pub struct Locator {
    pub selector: String,
}

#[derive(Debug, Deserialize)]
pub struct EmailFormData {
    pub login_form: EmailForm,
}

#[derive(Debug, Deserialize)]
pub struct EmailForm {
    pub email_input: Locator,
    pub continue_btn: Locator,
}

#[derive(Debug, Deserialize)]
pub struct VerifyFormData {
    pub login_form: VerifyForm,
}

#[derive(Debug, Deserialize)]
pub struct VerifyForm {
    pub verify_not_robot_checkbox: Locator,
}

#[derive(Debug, Deserialize)]
pub struct PasswordFormData {
    pub login_form: PasswordForm,
}

#[derive(Debug, Deserialize)]
pub struct PasswordForm {
    pub password_input: Locator,
    pub continue_btn: Locator,
}

#[derive(Debug, Deserialize)]
pub struct JobPostsData {
    pub job_posts: Vec<JobPost>,
}

#[derive(Debug, Deserialize)]
pub struct PaginationData {
    pub pagination: Pagination,
}

#[derive(Debug, Deserialize)]
pub struct Pagination {
    /// Absent on the last page of some listings.
    pub next_page_btn: Option<Locator>,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn extraction_payload_parses_into_job_posts() {
        let raw = r#"
        {
            "job_posts": [
                {
                    "org_name": "Riverside Shelter",
                    "job_title": "Volunteer Coordinator",
                    "salary": "$52,000 - $58,000",
                    "location": "Portland, OR",
                    "contract_type": "Full-time",
                    "location_type": "hybrid",
                    "date_posted": "2 days ago",
                    "url": "https://example.org/jobs/42"
                },
                {
                    "org_name": "Open Maps Lab",
                    "job_title": "GIS Contractor",
                    "salary": null,
                    "location": "Remote, USA",
                    "contract_type": "Contract",
                    "location_type": "remote",
                    "date_posted": "today",
                    "url": "https://example.org/jobs/43"
                }
            ]
        }
        "#;

        let data: JobPostsData = serde_json::from_str(raw).unwrap();
        assert_eq!(data.job_posts.len(), 2);
        assert_eq!(data.job_posts[0].org_name, "Riverside Shelter");
        assert!(data.job_posts[1].salary.is_none());
    }

    #[test]
    fn pagination_payload_allows_missing_control() {
        let with: PaginationData = serde_json::from_str(
            r#"{"pagination": {"next_page_btn": {"selector": "a[rel=next]"}}}"#,
        )
        .unwrap();
        assert!(with.pagination.next_page_btn.is_some());

        let without: PaginationData =
            serde_json::from_str(r#"{"pagination": {"next_page_btn": null}}"#).unwrap();
        assert!(without.pagination.next_page_btn.is_none());
    }
}
