//! Catalog book records and the offered book snapshot
use super::error::ExchangeError;

/// A book as the catalog knows it.
#[derive(Debug, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub struct BookRecord {
    #[n(0)]
    pub book_id: String,
    #[n(1)]
    pub name: String,
    #[n(2)]
    pub author: String,
    #[n(3)]
    pub condition: String,
    #[n(4)]
    pub image_url: Option<String>,
    #[n(5)]
    pub owner_email: String,
    #[n(6)]
    pub quantity: u32,
}

// Copied into the request at proposal time and never refreshed, so the owner
// can still evaluate the offer after the source book changes or is deleted.
#[derive(Debug, Clone, Default, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub struct OfferedBook {
    #[n(0)]
    pub book_id: String,
    #[n(1)]
    pub title: String,
    #[n(2)]
    pub author: String,
    #[n(3)]
    pub isbn: String,
    #[n(4)]
    pub condition: String,
    #[n(5)]
    pub image_url: Option<String>,
}

impl BookRecord {
    pub fn to_cbor(&self) -> Result<Vec<u8>, ExchangeError> {
        Ok(minicbor::to_vec(self)?)
    }

    pub fn from_cbor(bytes: &[u8]) -> Result<Self, ExchangeError> {
        Ok(minicbor::decode(bytes)?)
    }
}

impl OfferedBook {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn set_book_id(mut self, book_id: &str) -> Self {
        self.book_id = book_id.to_string();
        self
    }
    pub fn set_title(mut self, title: &str) -> Self {
        self.title = title.to_string();
        self
    }
    pub fn set_author(mut self, author: &str) -> Self {
        self.author = author.to_string();
        self
    }
    pub fn set_isbn(mut self, isbn: &str) -> Self {
        self.isbn = isbn.to_string();
        self
    }
    pub fn set_condition(mut self, condition: &str) -> Self {
        self.condition = condition.to_string();
        self
    }
    pub fn set_image_url(mut self, url: &str) -> Self {
        self.image_url = Some(url.to_string());
        self
    }
    /// Fill fields the client left blank from the catalog record.
    pub fn complete_from(mut self, record: &BookRecord) -> Self {
        if self.author.trim().is_empty() {
            self.author = record.author.clone();
        }
        if self.condition.trim().is_empty() {
            self.condition = record.condition.clone();
        }
        if self.image_url.is_none() {
            self.image_url = record.image_url.clone();
        }
        self
    }
    /// Checks the fields a target owner needs to evaluate the offer.
    pub fn validate(&self) -> Result<(), ExchangeError> {
        if self.book_id.trim().is_empty() {
            return Err(ExchangeError::Validation("offered book id is missing".into()));
        }
        if self.title.trim().is_empty() {
            return Err(ExchangeError::Validation(
                "offered book title is missing".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_fields() {
        let offer = OfferedBook::new()
            .set_book_id("B900")
            .set_title("Emma")
            .set_author("Jane Austen")
            .set_isbn("9780141439587")
            .set_condition("good")
            .set_image_url("https://img.example/emma.jpg");

        assert_eq!(offer.book_id, "B900");
        assert_eq!(offer.isbn, "9780141439587");
        assert_eq!(offer.image_url.as_deref(), Some("https://img.example/emma.jpg"));
        assert!(offer.validate().is_ok());
    }

    #[test]
    fn validate_rejects_missing_id_and_title() {
        let no_id = OfferedBook::new().set_title("Emma");
        let no_title = OfferedBook::new().set_book_id("B900").set_title("   ");

        assert!(matches!(no_id.validate(), Err(ExchangeError::Validation(_))));
        assert!(matches!(no_title.validate(), Err(ExchangeError::Validation(_))));
    }

    #[test]
    fn blank_fields_are_completed_from_catalog() {
        let record = BookRecord {
            book_id: "B900".into(),
            name: "Emma".into(),
            author: "Jane Austen".into(),
            condition: "worn".into(),
            image_url: Some("https://img.example/emma.jpg".into()),
            owner_email: "a@x.com".into(),
            quantity: 1,
        };

        let offer = OfferedBook::new()
            .set_book_id("B900")
            .set_title("Emma")
            .set_condition("like new")
            .complete_from(&record);

        assert_eq!(offer.author, "Jane Austen");
        assert_eq!(offer.condition, "like new");
        assert_eq!(offer.image_url, record.image_url);
    }
}
