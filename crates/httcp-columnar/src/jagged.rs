//! Ragged per-event arrays.
//!
//! Every event holds a variable number of values. Storage follows the usual
//! columnar layout: one flat buffer with all values of all events, plus entry
//! boundaries (`offsets.len() == n_events + 1`).

use std::fmt;
use std::marker::PhantomData;

use httcp_core::{Error, Result};
use serde::de::{Deserializer, SeqAccess, Visitor};
use serde::ser::{SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};

/// Per-event variable-length column.
#[derive(Debug, Clone, PartialEq)]
pub struct Jagged<T> {
    flat: Vec<T>,
    offsets: Vec<usize>,
}

impl<T> Jagged<T> {
    /// Build from a flat buffer and entry offsets.
    ///
    /// Offsets must start at 0, be non-decreasing and end at `flat.len()`.
    pub fn new(flat: Vec<T>, offsets: Vec<usize>) -> Result<Self> {
        match (offsets.first(), offsets.last()) {
            (Some(&0), Some(&last)) if last == flat.len() => {}
            _ => {
                return Err(Error::Shape(format!(
                    "offsets must start at 0 and end at {} (got {:?}..{:?})",
                    flat.len(),
                    offsets.first(),
                    offsets.last()
                )));
            }
        }
        if offsets.windows(2).any(|w| w[1] < w[0]) {
            return Err(Error::Shape("offsets must be non-decreasing".into()));
        }
        Ok(Self { flat, offsets })
    }

    /// Build from one `Vec` per event.
    pub fn from_nested(events: impl IntoIterator<Item = Vec<T>>) -> Self {
        let mut flat = Vec::new();
        let mut offsets = vec![0usize];
        for ev in events {
            flat.extend(ev);
            offsets.push(flat.len());
        }
        Self { flat, offsets }
    }

    /// `n_events` events with no objects.
    pub fn empty_events(n_events: usize) -> Self {
        Self { flat: Vec::new(), offsets: vec![0; n_events + 1] }
    }

    /// Number of events.
    pub fn n_events(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    /// Total number of objects across all events.
    pub fn n_objects(&self) -> usize {
        self.flat.len()
    }

    /// Flat value buffer.
    pub fn flat(&self) -> &[T] {
        &self.flat
    }

    /// Entry boundaries.
    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    /// Objects of event `row`. Panics if `row` is out of range.
    pub fn event(&self, row: usize) -> &[T] {
        &self.flat[self.offsets[row]..self.offsets[row + 1]]
    }

    /// Objects of event `row`, or `None` when out of range.
    pub fn get(&self, row: usize) -> Option<&[T]> {
        if row < self.n_events() { Some(self.event(row)) } else { None }
    }

    /// Number of objects per event.
    pub fn counts(&self) -> Vec<usize> {
        self.offsets.windows(2).map(|w| w[1] - w[0]).collect()
    }

    /// Iterate over events as slices.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &[T]> + '_ {
        self.offsets.windows(2).map(move |w| &self.flat[w[0]..w[1]])
    }

    /// First object of each event, if any.
    pub fn firsts(&self) -> Vec<Option<&T>> {
        self.iter().map(|ev| ev.first()).collect()
    }

    /// Whether `other` has exactly the same event/object structure.
    pub fn same_layout<U>(&self, other: &Jagged<U>) -> bool {
        self.offsets == other.offsets
    }

    /// Apply `f` to every object, keeping the structure.
    pub fn map<U>(&self, f: impl FnMut(&T) -> U) -> Jagged<U> {
        Jagged { flat: self.flat.iter().map(f).collect(), offsets: self.offsets.clone() }
    }

    /// Combine two columns of identical structure element-wise.
    pub fn zip_with<U, V>(
        &self,
        other: &Jagged<U>,
        mut f: impl FnMut(&T, &U) -> V,
    ) -> Result<Jagged<V>> {
        if !self.same_layout(other) {
            return Err(Error::Shape(format!(
                "cannot combine jagged arrays with different layouts ({} vs {} events, {} vs {} objects)",
                self.n_events(),
                other.n_events(),
                self.n_objects(),
                other.n_objects()
            )));
        }
        let flat = self.flat.iter().zip(other.flat.iter()).map(|(a, b)| f(a, b)).collect();
        Ok(Jagged { flat, offsets: self.offsets.clone() })
    }

    /// Combine every object with a per-event value (broadcast over the object axis).
    pub fn broadcast_with<U, V>(
        &self,
        per_event: &[U],
        mut f: impl FnMut(&T, &U) -> V,
    ) -> Result<Jagged<V>> {
        if per_event.len() != self.n_events() {
            return Err(Error::Shape(format!(
                "cannot broadcast {} per-event values over {} events",
                per_event.len(),
                self.n_events()
            )));
        }
        let mut flat = Vec::with_capacity(self.flat.len());
        for (ev, value) in self.iter().zip(per_event) {
            flat.extend(ev.iter().map(|x| f(x, value)));
        }
        Ok(Jagged { flat, offsets: self.offsets.clone() })
    }

    /// Keep only the objects whose mask entry is true.
    pub fn filter(&self, mask: &Jagged<bool>) -> Result<Jagged<T>>
    where
        T: Clone,
    {
        if !self.same_layout(mask) {
            return Err(Error::Shape(format!(
                "mask layout does not match column ({} vs {} objects)",
                mask.n_objects(),
                self.n_objects()
            )));
        }
        let mut flat = Vec::new();
        let mut offsets = Vec::with_capacity(self.offsets.len());
        offsets.push(0);
        for (ev, m) in self.iter().zip(mask.iter()) {
            flat.extend(ev.iter().zip(m).filter(|(_, keep)| **keep).map(|(x, _)| x.clone()));
            offsets.push(flat.len());
        }
        Ok(Jagged { flat, offsets })
    }
}

impl Jagged<bool> {
    /// True for every event with at least one true object.
    pub fn any(&self) -> Vec<bool> {
        self.iter().map(|ev| ev.iter().any(|&b| b)).collect()
    }

    /// Number of true objects per event.
    pub fn count_true(&self) -> Vec<usize> {
        self.iter().map(|ev| ev.iter().filter(|&&b| b).count()).collect()
    }

    /// Element-wise logical AND of two masks with identical structure.
    pub fn and(&self, other: &Jagged<bool>) -> Result<Jagged<bool>> {
        self.zip_with(other, |a, b| *a && *b)
    }
}

impl<T> From<Vec<Vec<T>>> for Jagged<T> {
    fn from(events: Vec<Vec<T>>) -> Self {
        Self::from_nested(events)
    }
}

impl<T: Clone> From<&Jagged<T>> for Vec<Vec<T>> {
    fn from(j: &Jagged<T>) -> Self {
        j.iter().map(|ev| ev.to_vec()).collect()
    }
}

// Serialized as nested arrays, one inner array per event.
impl<T: Serialize> Serialize for Jagged<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.n_events()))?;
        for ev in self.iter() {
            seq.serialize_element(ev)?;
        }
        seq.end()
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Jagged<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct JaggedVisitor<T>(PhantomData<T>);

        impl<'de, T: Deserialize<'de>> Visitor<'de> for JaggedVisitor<T> {
            type Value = Jagged<T>;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a list of per-event lists")
            }

            fn visit_seq<A: SeqAccess<'de>>(
                self,
                mut seq: A,
            ) -> std::result::Result<Self::Value, A::Error> {
                let mut flat = Vec::new();
                let mut offsets = Vec::with_capacity(seq.size_hint().unwrap_or(0) + 1);
                offsets.push(0);
                while let Some(ev) = seq.next_element::<Vec<T>>()? {
                    flat.extend(ev);
                    offsets.push(flat.len());
                }
                Ok(Jagged { flat, offsets })
            }
        }

        deserializer.deserialize_seq(JaggedVisitor(PhantomData))
    }
}
