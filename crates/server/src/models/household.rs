use serde::Serialize;

use crate::db::{
    rows::HouseholdRow, FieldCodec, FieldRef, Record, SecretString, StorageError, Timestamps,
};

/// A family or shared flat: the unit of authorization.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Household {
    pub id: String,
    pub name: SecretString,
    #[serde(flatten)]
    pub timestamps: Timestamps,
}

impl Household {
    pub fn new(id: impl Into<String>, name: impl Into<SecretString>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            timestamps: Timestamps::default(),
        }
    }

    /// Name given to the household created for a first-time user.
    pub fn default_name_for(owner_name: &str) -> String {
        format!("{owner_name}'s Household")
    }
}

impl Record for Household {
    type Row = HouseholdRow;

    fn id(&self) -> &str {
        &self.id
    }

    fn timestamps_mut(&mut self) -> &mut Timestamps {
        &mut self.timestamps
    }

    fn to_row(&self, codec: &dyn FieldCodec) -> Result<HouseholdRow, StorageError> {
        Ok(HouseholdRow {
            id: self.id.clone(),
            name: self
                .name
                .seal(codec, FieldRef::new(Self::TABLE, "name", &self.id))?,
            timestamps: self.timestamps.clone(),
        })
    }

    fn from_row(row: &HouseholdRow, codec: &dyn FieldCodec) -> Result<Self, StorageError> {
        Ok(Self {
            id: row.id.clone(),
            name: SecretString::open(&row.name, codec, FieldRef::new(Self::TABLE, "name", &row.id))?,
            timestamps: row.timestamps.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_name_uses_owner() {
        assert_eq!(Household::default_name_for("Ana"), "Ana's Household");
    }
}
