use std::str::FromStr;

use serde::{Deserialize, Serialize, Serializer};

use crate::db::{
    rows::AccountRow, FieldCodec, FieldRef, Record, SecretString, StorageError, Timestamps,
};

/// Where money is spent from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    /// Every household has exactly one, created with it. It cannot be edited or deleted.
    Cash,
    Bank,
    Card,
}

impl AccountKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AccountKind::Cash => "cash",
            AccountKind::Bank => "bank",
            AccountKind::Card => "card",
        }
    }
}

impl FromStr for AccountKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cash" => Ok(AccountKind::Cash),
            "bank" => Ok(AccountKind::Bank),
            "card" => Ok(AccountKind::Card),
            other => Err(format!("unknown account type: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    pub id: String,
    pub household_id: String,
    pub kind: AccountKind,
    pub name: SecretString,
    pub brand: Option<String>,
    pub bank: Option<String>,
    pub timestamps: Timestamps,
}

impl Account {
    /// The mandatory cash account of a household.
    pub fn cash(id: impl Into<String>, household_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            household_id: household_id.into(),
            kind: AccountKind::Cash,
            name: SecretString::new("Cash"),
            brand: None,
            bank: None,
            timestamps: Timestamps::default(),
        }
    }

    /// Label shown in the app.
    ///
    /// Cards are labelled by brand and issuing bank, falling back to whichever
    /// is present and finally to `"Card"`.
    pub fn display_name(&self) -> String {
        match self.kind {
            AccountKind::Cash => "Cash".into(),
            AccountKind::Card => {
                let brand = self.brand.as_deref().unwrap_or_default();
                let bank = self.bank.as_deref().unwrap_or_default();
                match (brand.is_empty(), bank.is_empty()) {
                    (false, false) => format!("{brand} - {bank}"),
                    (false, true) => brand.to_owned(),
                    (true, false) => bank.to_owned(),
                    (true, true) => "Card".into(),
                }
            }
            AccountKind::Bank => self.name.as_str().to_owned(),
        }
    }
}

impl Serialize for Account {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Json<'a> {
            id: &'a str,
            household_id: &'a str,
            #[serde(rename = "type")]
            kind: AccountKind,
            name: &'a SecretString,
            #[serde(skip_serializing_if = "Option::is_none")]
            brand: Option<&'a str>,
            #[serde(skip_serializing_if = "Option::is_none")]
            bank: Option<&'a str>,
            display_name: String,
            #[serde(flatten)]
            timestamps: &'a Timestamps,
        }

        Json {
            id: &self.id,
            household_id: &self.household_id,
            kind: self.kind,
            name: &self.name,
            brand: self.brand.as_deref(),
            bank: self.bank.as_deref(),
            display_name: self.display_name(),
            timestamps: &self.timestamps,
        }
        .serialize(serializer)
    }
}

impl Record for Account {
    type Row = AccountRow;

    fn id(&self) -> &str {
        &self.id
    }

    fn timestamps_mut(&mut self) -> &mut Timestamps {
        &mut self.timestamps
    }

    fn to_row(&self, codec: &dyn FieldCodec) -> Result<AccountRow, StorageError> {
        Ok(AccountRow {
            id: self.id.clone(),
            household_id: self.household_id.clone(),
            kind: self.kind,
            name: self
                .name
                .seal(codec, FieldRef::new(Self::TABLE, "name", &self.id))?,
            brand: self.brand.clone(),
            bank: self.bank.clone(),
            timestamps: self.timestamps.clone(),
        })
    }

    fn from_row(row: &AccountRow, codec: &dyn FieldCodec) -> Result<Self, StorageError> {
        Ok(Self {
            id: row.id.clone(),
            household_id: row.household_id.clone(),
            kind: row.kind,
            name: SecretString::open(&row.name, codec, FieldRef::new(Self::TABLE, "name", &row.id))?,
            brand: row.brand.clone(),
            bank: row.bank.clone(),
            timestamps: row.timestamps.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(kind: AccountKind, name: &str, brand: Option<&str>, bank: Option<&str>) -> Account {
        Account {
            id: "a".into(),
            household_id: "h".into(),
            kind,
            name: SecretString::new(name),
            brand: brand.map(Into::into),
            bank: bank.map(Into::into),
            timestamps: Timestamps::default(),
        }
    }

    #[test]
    fn display_names() {
        let cases = [
            (account(AccountKind::Cash, "Wallet", None, None), "Cash"),
            (account(AccountKind::Card, "", Some("Visa"), Some("Chase")), "Visa - Chase"),
            (account(AccountKind::Card, "", Some("Visa"), None), "Visa"),
            (account(AccountKind::Card, "", None, Some("Chase")), "Chase"),
            (account(AccountKind::Card, "", Some(""), None), "Card"),
            (account(AccountKind::Bank, "My Bank", None, None), "My Bank"),
        ];
        for (acc, expected) in cases {
            assert_eq!(acc.display_name(), expected);
        }
    }

    #[test]
    fn parses_known_kinds_only() {
        assert_eq!("card".parse::<AccountKind>().unwrap(), AccountKind::Card);
        assert!("crypto".parse::<AccountKind>().is_err());
    }

    #[test]
    fn json_has_type_and_display_name() {
        let v = serde_json::to_value(account(AccountKind::Card, "", Some("Visa"), None)).unwrap();
        assert_eq!(v["type"], "card");
        assert_eq!(v["display_name"], "Visa");
        assert!(v.get("bank").is_none());
    }
}
