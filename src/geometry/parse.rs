use crate::error::{ConstructionError, Result};
use crate::math::{Point3, Vector3};

use super::surface::{Cone, Cylinder, Plane, Sheet, Sphere, Surface};

/// Parses a quadric surface card.
///
/// Supported mnemonics (axis variants for x/y/z throughout):
///
/// - `p A B C D`: general plane `Ax + By + Cz = D`
/// - `px D`: plane normal to an axis
/// - `so R`: sphere at the origin
/// - `s x y z R`: general sphere
/// - `sx x0 R`: sphere centred on an axis
/// - `cx R`: cylinder on an axis
/// - `c/x y0 z0 R`: cylinder parallel to an axis
/// - `kx x0 T [S]`: cone on an axis, apex offset then tangent-squared of
///   the half-angle, optional sheet selector `1`/`-1`
///
/// # Errors
///
/// Returns an error naming the offending token for an unknown mnemonic,
/// a malformed number, a wrong argument count, or degenerate parameters.
pub fn parse_card(card: &str) -> Result<Surface> {
    let tokens: Vec<&str> = card.split_whitespace().collect();
    let Some((&mnemonic, args)) = tokens.split_first() else {
        return Err(ConstructionError::EmptyExpression.into());
    };

    match mnemonic {
        "p" => {
            let [a, b, c, d] = numbers::<4>(args)?;
            Ok(Surface::Plane(Plane::new(Vector3::new(a, b, c), d)?))
        }
        "px" | "py" | "pz" => {
            let [d] = numbers::<1>(args)?;
            Ok(Surface::Plane(Plane::new(axis_of(mnemonic), d)?))
        }
        "so" => {
            let [r] = numbers::<1>(args)?;
            Ok(Surface::Sphere(Sphere::new(Point3::origin(), r)?))
        }
        "s" => {
            let [x, y, z, r] = numbers::<4>(args)?;
            Ok(Surface::Sphere(Sphere::new(Point3::new(x, y, z), r)?))
        }
        "sx" | "sy" | "sz" => {
            let [c, r] = numbers::<2>(args)?;
            let center = Point3::from(axis_of(mnemonic) * c);
            Ok(Surface::Sphere(Sphere::new(center, r)?))
        }
        "cx" | "cy" | "cz" => {
            let [r] = numbers::<1>(args)?;
            Ok(Surface::Cylinder(Cylinder::new(
                Point3::origin(),
                axis_of(mnemonic),
                r,
            )?))
        }
        "c/x" | "c/y" | "c/z" => {
            let [u, v, r] = numbers::<3>(args)?;
            // The two offsets name the non-axis coordinates in x,y,z order.
            let point = match mnemonic {
                "c/x" => Point3::new(0.0, u, v),
                "c/y" => Point3::new(u, 0.0, v),
                _ => Point3::new(u, v, 0.0),
            };
            Ok(Surface::Cylinder(Cylinder::new(point, axis_of(mnemonic), r)?))
        }
        "kx" | "ky" | "kz" => {
            let (nums, sheet) = match args.len() {
                3 => (&args[..2], parse_sheet(args[2])?),
                _ => (args, Sheet::Both),
            };
            let [offset, tan_sq] = numbers::<2>(nums)?;
            let axis = axis_of(mnemonic);
            let apex = Point3::from(axis * offset);
            Ok(Surface::Cone(Cone::new(apex, axis, tan_sq, sheet)?))
        }
        other => Err(ConstructionError::UnknownSurfaceCard(other.into()).into()),
    }
}

/// Axis direction encoded in the final letter of a mnemonic.
fn axis_of(mnemonic: &str) -> Vector3 {
    match mnemonic.as_bytes()[mnemonic.len() - 1] {
        b'x' => Vector3::x(),
        b'y' => Vector3::y(),
        _ => Vector3::z(),
    }
}

fn parse_sheet(token: &str) -> Result<Sheet> {
    match token {
        "1" | "+1" => Ok(Sheet::Positive),
        "-1" => Ok(Sheet::Negative),
        other => Err(ConstructionError::UnexpectedToken {
            token: other.into(),
            context: "cone sheet selector",
        }
        .into()),
    }
}

fn numbers<const N: usize>(args: &[&str]) -> Result<[f64; N]> {
    if args.len() != N {
        let token = args.get(N).copied().unwrap_or("<missing>");
        return Err(ConstructionError::UnexpectedToken {
            token: token.into(),
            context: "surface card",
        }
        .into());
    }
    let mut out = [0.0; N];
    for (slot, token) in out.iter_mut().zip(args) {
        *slot = token.parse().map_err(|_| ConstructionError::UnexpectedToken {
            token: (*token).into(),
            context: "surface card",
        })?;
    }
    Ok(out)
}
