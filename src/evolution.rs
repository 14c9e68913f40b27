use chrono::{DateTime, Utc};
use tracing::info;

use crate::{
    catalog::Catalog,
    error::LabError,
    material::{Material, Mutation},
    rng::Roll,
    settings::Settings,
};

/// Boosts one random subfield of a living material in place and records the
/// mutation. Non-living types, and already evolved materials when
/// `mutation.allowMultiple` is off, are rejected before anything is drawn
/// or changed.
pub fn evolve<R: Roll>(
    material: &mut Material,
    catalog: &Catalog,
    settings: &Settings,
    now: DateTime<Utc>,
    rng: &mut R,
) -> Result<Mutation, LabError> {
    if !material.kind.is_living() {
        return Err(LabError::UnsupportedOperation(format!(
            "only living organisms can evolve, '{}' is a {}",
            material.name, material.kind
        )));
    }
    if material.evolved && !settings.mutation.allow_multiple {
        return Err(LabError::UnsupportedOperation(format!(
            "'{}' has already evolved and repeat mutations are disabled",
            material.name
        )));
    }

    let field = catalog
        .pick_field(rng)
        .ok_or_else(|| LabError::Catalog("catalog has no fields".into()))?;
    let subfield = field.subfields[rng.roll_index(field.subfields.len())].clone();
    let span = settings.mutation.max_boost.saturating_sub(settings.mutation.min_boost) as f64;
    let boost = (rng.roll() * span + settings.mutation.min_boost as f64).floor() as u32;

    let value = material.boost_stat(&field.id, &subfield, boost, &settings.rep_values);
    let mutation = Mutation {
        field: field.id.clone(),
        subfield,
        boost,
        timestamp: now,
    };
    material.evolved = true;
    material.mutations.push(mutation.clone());
    info!(
        material = %material.name,
        field = %mutation.field,
        subfield = %mutation.subfield,
        boost,
        value,
        "material evolved"
    );
    Ok(mutation)
}
