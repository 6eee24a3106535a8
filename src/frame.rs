//! Frame identifiers and conversion to the SNAME body-frame convention.
use crate::ModelError;
use nalgebra::DMatrix;
use serde::Deserialize;

/// Inertial frame the vehicle pose is expressed in
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum InertialFrame {
    /// East-north-up world frame
    #[default]
    World,
    /// North-east-down world frame
    WorldNed,
}

/// Body frame attached to the vehicle, determined by the inertial frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyFrame {
    /// Forward-left-up body frame, paired with [`InertialFrame::World`]
    BaseLink,
    /// Forward-right-down body frame (SNAME), paired with [`InertialFrame::WorldNed`]
    BaseLinkNed,
}

impl From<InertialFrame> for BodyFrame {
    fn from(frame: InertialFrame) -> Self {
        match frame {
            InertialFrame::World => BodyFrame::BaseLink,
            InertialFrame::WorldNed => BodyFrame::BaseLinkNed,
        }
    }
}

impl BodyFrame {
    /// Frame identifier as used by the vehicle description
    pub fn id(&self) -> &'static str {
        match self {
            BodyFrame::BaseLink => "base_link",
            BodyFrame::BaseLinkNed => "base_link_ned",
        }
    }
    /// Expresses a batch of body vectors in the SNAME convention
    /// # Arguments
    /// * `x` - One vector per row, either 3 (linear) or 6 (linear + angular) columns
    /// # Returns
    /// * The batch with the y and z axes of each 3-vector block negated, or
    ///   unchanged when the body frame already follows SNAME
    /// # Errors
    /// * `ShapeMismatchError` when `x` has neither 3 nor 6 columns
    pub fn to_sname(&self, x: &DMatrix<f64>) -> Result<DMatrix<f64>, ModelError> {
        let flipped: &[usize] = match x.ncols() {
            3 => &[1, 2],
            6 => &[1, 2, 4, 5],
            n => {
                return Err(ModelError::ShapeMismatchError(format!(
                    "SNAME conversion expects 3 or 6 columns, got {}",
                    n
                )))
            }
        };
        let mut out = x.clone();
        if *self == BodyFrame::BaseLinkNed {
            return Ok(out);
        }
        for &j in flipped {
            out.column_mut(j).neg_mut();
        }
        Ok(out)
    }
    /// Inverse of [`BodyFrame::to_sname`]; the axis flip is its own inverse
    pub fn from_sname(&self, x: &DMatrix<f64>) -> Result<DMatrix<f64>, ModelError> {
        self.to_sname(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flips_y_and_z_of_linear_and_angular_parts() {
        let x = DMatrix::from_row_slice(2, 6, &[
            1.0, 2.0, 3.0, 4.0, 5.0, 6.0, //
            -1.0, -2.0, -3.0, -4.0, -5.0, -6.0,
        ]);
        let sname = BodyFrame::BaseLink.to_sname(&x).unwrap();
        assert_eq!(
            sname,
            DMatrix::from_row_slice(2, 6, &[
                1.0, -2.0, -3.0, 4.0, -5.0, -6.0, //
                -1.0, 2.0, 3.0, -4.0, 5.0, 6.0,
            ])
        );
        assert_eq!(BodyFrame::BaseLink.from_sname(&sname).unwrap(), x);
    }

    #[test]
    fn three_vectors_and_ned_frame() {
        let x = DMatrix::from_row_slice(1, 3, &[0.5, 1.5, -2.5]);
        assert_eq!(
            BodyFrame::BaseLink.to_sname(&x).unwrap(),
            DMatrix::from_row_slice(1, 3, &[0.5, -1.5, 2.5])
        );
        assert_eq!(BodyFrame::BaseLinkNed.to_sname(&x).unwrap(), x);
        assert_eq!(BodyFrame::from(InertialFrame::WorldNed).id(), "base_link_ned");
    }

    #[test]
    fn rejects_other_widths() {
        let x = DMatrix::<f64>::zeros(1, 4);
        assert!(matches!(
            BodyFrame::BaseLink.to_sname(&x),
            Err(ModelError::ShapeMismatchError(_))
        ));
        assert!(BodyFrame::BaseLinkNed.to_sname(&x).is_err());
    }
}
