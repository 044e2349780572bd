//! Terrain loader: scenario rows to a shared Rapier query world.
//!
//! Design notes
//! - Terrain is immutable. We build once per run and share it between the clamper's
//!   batch and three-point query services through an `Arc`.
//! - Determinism: `TerrainQueryWorld::build` sorts definitions by `id`.
//! - Heightmaps are expanded to triangle meshes here; the query world only knows
//!   Rapier shapes.

use std::sync::Arc;

use groundclamp::{Rot, TerrainDef, TerrainQueryWorld, TerrainShapeDef, Vec3};

use crate::scenario::{ScenarioError, TerrainRow, TerrainShape};

/// Build the shared terrain query world for a scenario.
pub fn build_terrain(rows: &[TerrainRow]) -> Result<Arc<TerrainQueryWorld>, ScenarioError> {
    let defs = rows.iter().map(row_to_def).collect::<Result<Vec<_>, _>>()?;
    let world = TerrainQueryWorld::build(defs)?;
    log::info!("Built terrain with {} pieces.", world.len());
    Ok(Arc::new(world))
}

/// Convert a single scenario row to a terrain definition.
///
/// Mapping rules:
/// - Plane(offset): `normal = rotation * +Z`, plane through `translation + normal * offset`.
/// - Cuboid / Ball: oriented using the row's translation and rotation.
/// - Heightmap: triangulated grid in the row's local frame.
fn row_to_def(row: &TerrainRow) -> Result<TerrainDef, ScenarioError> {
    let [yaw, pitch, roll] = row.yaw_pitch_roll;

    let shape = match &row.shape {
        TerrainShape::Plane { offset } => TerrainShapeDef::Plane {
            offset_along_normal: *offset,
        },
        TerrainShape::Cuboid { half_extents } => TerrainShapeDef::Cuboid {
            half_extents: Vec3::from(*half_extents),
        },
        TerrainShape::Ball { radius } => TerrainShapeDef::Ball { radius: *radius },
        TerrainShape::Heightmap {
            cell_size,
            columns,
            heights,
        } => heightmap_trimesh(row.id, *cell_size, *columns, heights)?,
        TerrainShape::Trimesh { vertices, indices } => TerrainShapeDef::Trimesh {
            vertices: vertices.iter().copied().map(Vec3::from).collect(),
            indices: indices.clone(),
        },
    };

    Ok(TerrainDef {
        id: row.id,
        translation: Vec3::from(row.translation),
        rotation: Rot::from_euler_angles(roll, pitch, yaw),
        shape,
    })
}

/// Triangulate a row-major height grid centered on the origin.
fn heightmap_trimesh(
    id: u32,
    cell_size: f32,
    columns: u32,
    heights: &[f32],
) -> Result<TerrainShapeDef, ScenarioError> {
    let invalid = |reason: String| {
        ScenarioError::Terrain(groundclamp::TerrainError::InvalidShape { id, reason })
    };

    if columns < 2 || heights.len() % columns as usize != 0 {
        return Err(invalid(format!(
            "heightmap needs at least 2 columns and whole rows, got {} samples for {} columns",
            heights.len(),
            columns
        )));
    }
    let rows = heights.len() as u32 / columns;
    if rows < 2 {
        return Err(invalid("heightmap needs at least 2 rows".to_string()));
    }
    if !cell_size.is_finite() || cell_size <= 0.0 {
        let reason = format!("heightmap cell size must be positive, got {cell_size}");
        return Err(invalid(reason));
    }

    let half_w = (columns - 1) as f32 * cell_size * 0.5;
    let half_h = (rows - 1) as f32 * cell_size * 0.5;

    let mut vertices = Vec::with_capacity(heights.len());
    for r in 0..rows {
        for c in 0..columns {
            let z = heights[(r * columns + c) as usize];
            vertices.push(Vec3::new(
                c as f32 * cell_size - half_w,
                r as f32 * cell_size - half_h,
                z,
            ));
        }
    }

    let mut indices = Vec::with_capacity(((rows - 1) * (columns - 1) * 2) as usize);
    for r in 0..rows - 1 {
        for c in 0..columns - 1 {
            let i = r * columns + c;
            indices.push([i, i + 1, i + columns + 1]);
            indices.push([i, i + columns + 1, i + columns]);
        }
    }

    Ok(TerrainShapeDef::Trimesh { vertices, indices })
}
