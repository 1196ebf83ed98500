// src/consolidation/backfill.rs
use crate::models::record::Record;

/// Fills every empty field of `survivor` for which `donor` holds a non-empty
/// value. Only fields already present on the survivor are considered, and a
/// filled field is never overwritten. Returns the names of the fields filled.
pub fn backfill(survivor: &mut Record, donor: &Record) -> Vec<String> {
    let mut filled = Vec::new();
    for (name, slot) in survivor.iter_mut() {
        if !slot.is_empty() {
            continue;
        }
        if let Some(value) = donor.get(name).filter(|v| !v.is_empty()) {
            *slot = value.clone();
            filled.push(name.to_string());
        }
    }
    filled
}

/// Applies [`backfill`] for each donor in turn; earlier donors take precedence.
pub fn backfill_from_all<'a, I>(survivor: &mut Record, donors: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut filled = Vec::new();
    for donor in donors {
        filled.extend(backfill(survivor, donor));
    }
    filled
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::record::FieldValue;

    #[test]
    fn test_fills_only_empty_slots() {
        let mut survivor = Record::from_pairs([
            ("Id", "001"),
            ("Name", "Acme"),
            ("Phone", ""),
            ("Website", "NA"),
        ]);
        survivor.set("Fax", FieldValue::Null);
        let donor = Record::from_pairs([
            ("Id", "002"),
            ("Name", "ACME LTDA"),
            ("Phone", "555-0100"),
            ("Website", "acme.example"),
            ("Fax", "NA"),
            ("Industry", "Retail"),
        ]);

        let filled = backfill(&mut survivor, &donor);
        assert_eq!(filled, vec!["Phone", "Website"]);
        assert_eq!(survivor.get("Id"), Some(&FieldValue::from("001")));
        assert_eq!(survivor.get("Name"), Some(&FieldValue::from("Acme")));
        assert_eq!(survivor.get("Phone"), Some(&FieldValue::from("555-0100")));
        assert_eq!(survivor.get("Fax"), Some(&FieldValue::Null));
        // Fields absent from the survivor are not introduced.
        assert!(!survivor.contains_field("Industry"));
    }

    #[test]
    fn test_first_donor_wins() {
        let mut survivor = Record::from_pairs([("Id", "001"), ("Phone", "")]);
        let first = Record::from_pairs([("Id", "002"), ("Phone", "111")]);
        let second = Record::from_pairs([("Id", "003"), ("Phone", "222")]);

        let filled = backfill_from_all(&mut survivor, [&first, &second]);
        assert_eq!(filled, vec!["Phone"]);
        assert_eq!(survivor.get("Phone"), Some(&FieldValue::from("111")));
    }

    #[test]
    fn test_donor_not_mutated() {
        let mut survivor = Record::from_pairs([("Id", "001"), ("Phone", "")]);
        let donor = Record::from_pairs([("Id", "002"), ("Phone", "111")]);
        let before = donor.clone();
        backfill(&mut survivor, &donor);
        assert_eq!(donor, before);
    }
}
