/// Crawl cursor and its pagination transition
///
/// The cursor is the only mutable crawl state. It names the category, the
/// index page inside that category and the product slot on that index page
/// that the engine processes next.
use crate::config::CursorSeed;
use std::fmt;
use thiserror::Error;

/// Invariant violations detected on a cursor
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CursorError {
    #[error("category list is empty")]
    NoCategories,

    #[error("category index {index} is out of range for {count} categories")]
    CategoryOutOfRange { index: usize, count: usize },

    #[error("completed cursor must point one past the last category ({count}), found {index}")]
    CompletedOffset { index: usize, count: usize },

    #[error("index page numbers start at 1")]
    ZeroIndexPage,

    #[error("product positions start at 1")]
    ZeroProductPosition,
}

/// Outcome of a single [`Cursor::advance`] call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// Same index page, next product
    NextProduct,
    /// First product of the next index page in the same category
    NextIndexPage,
    /// First product of the first index page of the next category
    NextCategory,
    /// The last product of the last category was processed
    Completed,
    /// The cursor was already terminal; nothing changed
    Idle,
}

/// Persisted pagination position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub category_index: usize,
    /// 1-based index page number within the current category
    pub index_page: u32,
    /// 1-based product slot on the current index page
    pub product_position: u32,
    /// Last observed page count of the current category, 0 when unknown
    pub total_pages: u32,
    pub completed: bool,
}

impl Default for Cursor {
    fn default() -> Self {
        Self {
            category_index: 0,
            index_page: 1,
            product_position: 1,
            total_pages: 0,
            completed: false,
        }
    }
}

impl Cursor {
    /// Builds a cursor from the optional `[cursor]` configuration section
    pub fn from_seed(seed: &CursorSeed) -> Self {
        Self {
            category_index: seed.curr_category,
            index_page: seed.index_page,
            product_position: seed.product_page,
            total_pages: seed.total_pages,
            completed: seed.completed,
        }
    }

    /// Checks the cursor against the category list it indexes into
    pub fn validate(&self, category_count: usize) -> Result<(), CursorError> {
        if category_count == 0 {
            return Err(CursorError::NoCategories);
        }

        if self.completed {
            if self.category_index != category_count {
                return Err(CursorError::CompletedOffset {
                    index: self.category_index,
                    count: category_count,
                });
            }
            return Ok(());
        }

        if self.category_index >= category_count {
            return Err(CursorError::CategoryOutOfRange {
                index: self.category_index,
                count: category_count,
            });
        }
        if self.index_page == 0 {
            return Err(CursorError::ZeroIndexPage);
        }
        if self.product_position == 0 {
            return Err(CursorError::ZeroProductPosition);
        }

        Ok(())
    }

    /// Returns true once every category has been walked
    pub fn is_terminal(&self) -> bool {
        self.completed
    }

    /// Records the page count observed on the current index page
    ///
    /// Returns true when the stored value was corrected and must be persisted.
    pub fn refresh_total_pages(&mut self, observed: u32) -> bool {
        if self.total_pages == observed {
            return false;
        }
        self.total_pages = observed;
        true
    }

    /// Moves past the product at `product_position`
    ///
    /// `products_on_page` is the number of product links found on the current
    /// index page. A position at or beyond that count exhausts the page.
    pub fn advance(
        &mut self,
        products_on_page: usize,
        category_count: usize,
    ) -> Result<Advance, CursorError> {
        if self.completed {
            return Ok(Advance::Idle);
        }
        self.validate(category_count)?;

        if (self.product_position as usize) < products_on_page {
            self.product_position += 1;
            return Ok(Advance::NextProduct);
        }

        if self.index_page < self.total_pages {
            self.product_position = 1;
            self.index_page += 1;
            return Ok(Advance::NextIndexPage);
        }

        if self.category_index + 1 < category_count {
            self.product_position = 1;
            self.index_page = 1;
            self.total_pages = 0;
            self.category_index += 1;
            return Ok(Advance::NextCategory);
        }

        self.category_index = category_count;
        self.completed = true;
        Ok(Advance::Completed)
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.completed {
            write!(f, "completed")
        } else {
            write!(
                f,
                "category {} page {}/{} product {}",
                self.category_index, self.index_page, self.total_pages, self.product_position
            )
        }
    }
}
