use crate::clients::platform_client::fields;
use crate::domain::language_code_is_valid;
use crate::utils::is_empty_or_whitespace;
use serde::Serialize;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Newsletter {
    pub slug: String,
    pub title: String,
    pub description: String,
    /// `show`, `active` and `order` are listing hints for clients of
    /// `GET /newsletters`. Reconciliation treats every catalog row alike.
    pub show: bool,
    pub active: bool,
    pub order: i32,
    pub vendor_id: String,
    pub languages: Vec<String>,
    pub welcome: String,
}

impl TryFrom<PgRow> for Newsletter {
    type Error = sqlx::Error;

    fn try_from(row: PgRow) -> Result<Self, Self::Error> {
        let languages: String = row.try_get("languages")?;

        Ok(Self {
            slug: row.try_get("slug")?,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            show: row.try_get("show")?,
            active: row.try_get("active")?,
            order: row.try_get("order")?,
            vendor_id: row.try_get("vendor_id")?,
            languages: split_languages(&languages),
            welcome: row.try_get("welcome")?,
        })
    }
}

impl Newsletter {
    pub async fn all(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query(
            r#"
              SELECT slug, title, description, show, active, "order", vendor_id, languages, welcome
              FROM newsletters
              ORDER BY "order", slug
            "#,
        )
        .fetch_all(pool)
        .await?
        .into_iter()
        .map(Newsletter::try_from)
        .collect()
    }

    pub async fn store(&self, pool: &PgPool) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
              INSERT INTO newsletters
                (slug, title, description, show, active, "order", vendor_id, languages, welcome)
              VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(&self.slug)
        .bind(&self.title)
        .bind(&self.description)
        .bind(self.show)
        .bind(self.active)
        .bind(self.order)
        .bind(&self.vendor_id)
        .bind(self.languages.join(","))
        .bind(&self.welcome)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// The welcome message id, if this newsletter has one.
    pub fn welcome_id(&self) -> Option<&str> {
        if is_empty_or_whitespace(&self.welcome) {
            None
        } else {
            Some(self.welcome.trim())
        }
    }

    pub fn supports_language(&self, lang: &str) -> bool {
        language_code_is_valid(lang, &self.languages) && !lang.trim().is_empty()
    }

    pub fn flag_field(&self) -> String {
        fields::flag(&self.vendor_id)
    }

    pub fn date_field(&self) -> String {
        fields::date(&self.vendor_id)
    }
}

fn split_languages(languages: &str) -> Vec<String> {
    languages
        .split(',')
        .map(str::trim)
        .filter(|lang| !lang.is_empty())
        .map(String::from)
        .collect()
}

/// Every newsletter a subscriber could be on, in display order.
#[derive(Debug, Clone, Default)]
pub struct NewsletterCatalog {
    newsletters: Vec<Newsletter>,
}

impl NewsletterCatalog {
    pub fn new(newsletters: Vec<Newsletter>) -> Self {
        Self { newsletters }
    }

    #[tracing::instrument(name = "Loading the newsletter catalog", skip(pool))]
    pub async fn load(pool: &PgPool) -> Result<Self, sqlx::Error> {
        Ok(Self::new(Newsletter::all(pool).await?))
    }

    pub fn by_slug(&self, slug: &str) -> Option<&Newsletter> {
        self.newsletters.iter().find(|n| n.slug == slug)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Newsletter> {
        self.newsletters.iter()
    }

    pub fn slugs(&self) -> Vec<String> {
        self.newsletters.iter().map(|n| n.slug.clone()).collect()
    }

    /// Every language any newsletter is offered in, without duplicates.
    pub fn languages(&self) -> Vec<String> {
        let mut languages: Vec<String> = Vec::new();

        for lang in self.newsletters.iter().flat_map(|n| n.languages.iter()) {
            if !languages.contains(lang) {
                languages.push(lang.clone());
            }
        }

        languages
    }
}
