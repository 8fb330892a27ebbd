use std::{collections::HashMap, path::Path, sync::OnceLock};

use serde::{Deserialize, Serialize};

use crate::error::LoadError;

const BUILTIN_DATASET: &str = include_str!("../data/service-categories.json");

static TABLE: OnceLock<CategoryTable> = OnceLock::new();

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    #[serde(alias = "_id")]
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub sub_categories: Vec<SubCategory>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct SubCategory {
    #[serde(alias = "_id")]
    pub key: String,
    pub name: String,
}

/// Category and sub-category display names. The process-wide table is built
/// once, from the compiled-in dataset or a file installed with [`init`], and
/// never modified afterwards.
#[derive(Debug, Clone, Default)]
pub struct CategoryTable {
    categories: Vec<Category>,
    category_names: HashMap<String, String>,
    sub_category_names: HashMap<String, String>,
}

impl CategoryTable {
    pub fn new(categories: Vec<Category>) -> Self {
        let mut category_names = HashMap::new();
        let mut sub_category_names = HashMap::new();
        for category in &categories {
            category_names.insert(category.key.clone(), category.name.clone());
            for sub in &category.sub_categories {
                sub_category_names.insert(sub.key.clone(), sub.name.clone());
            }
        }
        Self {
            categories,
            category_names,
            sub_category_names,
        }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        Ok(Self::new(serde_json::from_str(json)?))
    }

    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        let contents = tokio::fs::read_to_string(path).await?;
        Ok(Self::from_json(&contents)?)
    }

    pub fn category_name(&self, key: &str) -> Option<&str> {
        self.category_names.get(key).map(String::as_str)
    }

    pub fn sub_category_name(&self, key: &str) -> Option<&str> {
        self.sub_category_names.get(key).map(String::as_str)
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }
}

fn builtin() -> CategoryTable {
    CategoryTable::from_json(BUILTIN_DATASET).expect("Invalid built-in category dataset")
}

/// Install the process-wide table. Fails, handing the table back, if a table
/// is already in place.
pub fn init(table: CategoryTable) -> Result<(), CategoryTable> {
    TABLE.set(table)
}

/// The process-wide table, falling back to the built-in dataset.
pub fn lookup() -> &'static CategoryTable {
    TABLE.get_or_init(builtin)
}
