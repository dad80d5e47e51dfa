//! Decoding of comparison results
//!
//! The service returns changed elements as parallel arrays, one slot per
//! element. Optional arrays may be absent entirely.

use crate::error::{Error, Result};
use crate::types::{ChangedElement, Opcode, PropertyChecksums, TypeOfChange};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Raw changed elements as stored by the comparison service
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangedElementsPayload {
    /// Element IDs
    pub elements: Vec<String>,
    /// ECClass IDs
    pub class_ids: Vec<String>,
    /// Opcode wire codes
    pub opcodes: Vec<i64>,
    /// Type of change bitmasks
    #[serde(rename = "type")]
    pub types: Vec<u32>,
    /// Model IDs
    #[serde(default)]
    pub model_ids: Vec<String>,
    /// Parent IDs, `"0"` for none
    #[serde(default)]
    pub parent_ids: Vec<String>,
    /// Parent ECClass IDs
    #[serde(default)]
    pub parent_class_ids: Vec<String>,
    /// Changed property names per element
    #[serde(default)]
    pub properties: Vec<Vec<String>>,
    /// Old checksums, aligned with `properties`
    #[serde(default)]
    pub old_checksums: Vec<Vec<Option<i64>>>,
    /// New checksums, aligned with `properties`
    #[serde(default)]
    pub new_checksums: Vec<Vec<Option<i64>>>,
}

impl ChangedElementsPayload {
    /// Number of changed elements
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Whether the comparison found no changes
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    fn check_lengths(&self) -> Result<()> {
        let n = self.elements.len();
        let required = [
            ("classIds", self.class_ids.len()),
            ("opcodes", self.opcodes.len()),
            ("type", self.types.len()),
        ];
        let optional = [
            ("modelIds", self.model_ids.len()),
            ("parentIds", self.parent_ids.len()),
            ("parentClassIds", self.parent_class_ids.len()),
            ("properties", self.properties.len()),
            ("oldChecksums", self.old_checksums.len()),
            ("newChecksums", self.new_checksums.len()),
        ];

        for (name, len) in required {
            if len != n {
                return Err(Error::Internal(format!(
                    "changed elements payload: {name} has {len} values for {n} elements"
                )));
            }
        }
        for (name, len) in optional {
            if len != 0 && len != n {
                return Err(Error::Internal(format!(
                    "changed elements payload: {name} has {len} values for {n} elements"
                )));
            }
        }
        Ok(())
    }

    /// Zip the parallel arrays into elements
    pub fn into_changed_elements(self) -> Result<Vec<ChangedElement>> {
        self.check_lengths()?;

        let mut elements = Vec::with_capacity(self.elements.len());
        for (i, id) in self.elements.iter().enumerate() {
            let code = self.opcodes[i];
            let opcode = Opcode::from_code(code).ok_or_else(|| {
                Error::Internal(format!("unknown opcode {code} for element {id}"))
            })?;

            let mut properties = IndexMap::new();
            if let Some(names) = self.properties.get(i) {
                for (j, name) in names.iter().enumerate() {
                    let checksum = |sums: &[Vec<Option<i64>>]| {
                        sums.get(i).and_then(|row| row.get(j)).copied().flatten()
                    };
                    properties.insert(
                        name.clone(),
                        PropertyChecksums {
                            old_checksum: checksum(&self.old_checksums),
                            new_checksum: checksum(&self.new_checksums),
                        },
                    );
                }
            }

            elements.push(ChangedElement {
                id: id.clone(),
                class_id: self.class_ids[i].clone(),
                opcode,
                type_of_change: TypeOfChange::from_bits_retain(self.types[i]),
                model_id: self.model_ids.get(i).cloned().unwrap_or_default(),
                parent_id: self.parent_ids.get(i).and_then(|p| non_null_id(p)),
                parent_class_id: self.parent_class_ids.get(i).and_then(|p| non_null_id(p)),
                properties,
            });
        }
        Ok(elements)
    }
}

fn non_null_id(id: &str) -> Option<String> {
    match id {
        "" | "0" | "0x0" => None,
        other => Some(other.to_string()),
    }
}
