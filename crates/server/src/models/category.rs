use serde::Serialize;

use crate::db::{
    rows::CategoryRow, FieldCodec, FieldRef, Record, SecretString, StorageError, Timestamps,
};

/// A spending bucket with a monthly budget.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Category {
    pub id: String,
    pub household_id: String,
    pub name: SecretString,
    pub monthly_budget: f64,
    pub is_active: bool,
    #[serde(flatten)]
    pub timestamps: Timestamps,
}

impl Category {
    pub fn new(
        id: impl Into<String>,
        household_id: impl Into<String>,
        name: impl Into<SecretString>,
        monthly_budget: f64,
    ) -> Self {
        Self {
            id: id.into(),
            household_id: household_id.into(),
            name: name.into(),
            monthly_budget,
            is_active: true,
            timestamps: Timestamps::default(),
        }
    }
}

impl Record for Category {
    type Row = CategoryRow;

    fn id(&self) -> &str {
        &self.id
    }

    fn timestamps_mut(&mut self) -> &mut Timestamps {
        &mut self.timestamps
    }

    fn to_row(&self, codec: &dyn FieldCodec) -> Result<CategoryRow, StorageError> {
        Ok(CategoryRow {
            id: self.id.clone(),
            household_id: self.household_id.clone(),
            name: self
                .name
                .seal(codec, FieldRef::new(Self::TABLE, "name", &self.id))?,
            monthly_budget: self.monthly_budget,
            is_active: self.is_active,
            timestamps: self.timestamps.clone(),
        })
    }

    fn from_row(row: &CategoryRow, codec: &dyn FieldCodec) -> Result<Self, StorageError> {
        Ok(Self {
            id: row.id.clone(),
            household_id: row.household_id.clone(),
            name: SecretString::open(&row.name, codec, FieldRef::new(Self::TABLE, "name", &row.id))?,
            monthly_budget: row.monthly_budget,
            is_active: row.is_active,
            timestamps: row.timestamps.clone(),
        })
    }
}
