mod request;
mod response;
mod wrapper;

pub use request::*;
pub use response::*;
pub use wrapper::*;

use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, Debug, Default)]
pub struct PageQueryParams {
    #[serde(default)]
    pub page: Option<String>,
}

impl PageQueryParams {
    pub fn page_number(&self) -> usize {
        crate::pagination::parse_page_number(self.page.as_deref())
    }
}
