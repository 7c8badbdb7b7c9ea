use quick_error::quick_error;
use std::io::Error as IOError;
use std::path::PathBuf;
use std::process::ExitStatus;

quick_error! {
    /// Error type for all error variants originated by this crate.
    #[derive(Debug)]
    pub enum AnalysisError {
        /// Invalid or unsupported Gmsh mesh file.
        InvalidMshFormat(reason: String) {
            display("Invalid Gmsh mesh file: {}", reason)
        }

        /// Only version 2 annot files with an embedded colortable are supported.
        UnsupportedFsAnnotFormatVersion {
            display("Unsupported FreeSurfer annot file format version")
        }

        MeshNotFound(path: PathBuf) {
            display("Field mesh file not found: {}", path.display())
        }

        SubjectDirNotFound(path: PathBuf) {
            display("Subject model directory not found: {}", path.display())
        }

        /// The requested field is not part of the mesh. Lists the fields which are.
        FieldNotFound { name: String, available: Vec<String> } {
            display("Field '{}' not found in mesh, available fields: {:?}", name, available)
        }

        FieldNotScalar { name: String, components: usize } {
            display("Field '{}' has {} components, a scalar field is required", name, components)
        }

        /// The requested region is not part of the atlas. Lists the regions which are.
        RegionNotFound { region: String, atlas_type: String, available: Vec<String> } {
            display("Region '{}' not found in atlas '{}', available regions: {:?}", region, atlas_type, available)
        }

        AtlasUnavailable { atlas_type: String, subject_dir: PathBuf, reason: String } {
            display("Cannot build atlas '{}' for subject {}: {}", atlas_type, subject_dir.display(), reason)
        }

        /// Two arrays that must line up do not.
        LengthMismatch { what: String, expected: usize, actual: usize } {
            display("Length mismatch for {}: expected {}, got {}", what, expected, actual)
        }

        InvalidShape(reason: String) {
            display("Invalid array shape: {}", reason)
        }

        InvalidRoi(reason: String) {
            display("Invalid ROI: {}", reason)
        }

        /// A sphere ROI which does not contain a single node or element.
        EmptySphere { center: [f64; 3], radius: f64, space: &'static str } {
            display("No mesh {} found within radius {} mm of center ({}, {}, {})", space, radius, center[0], center[1], center[2])
        }

        SurfaceRequired(reason: String) {
            display("Analysis requires a cortical surface mesh: {}", reason)
        }

        /// The external surface extraction tool failed.
        SurfaceExtraction { program: String, status: Option<ExitStatus>, stdout: String, stderr: String } {
            display("Surface extraction with '{}' failed ({}).\nstdout:\n{}\nstderr:\n{}",
                program,
                status.map(|s| s.to_string()).unwrap_or_else(|| String::from("no output produced")),
                stdout,
                stderr)
        }

        /// I/O Error
        Io(err: IOError) {
            from()
            source(err)
        }

        Shape(err: ndarray::ShapeError) {
            from()
            source(err)
        }

        Json(err: serde_json::Error) {
            from()
            source(err)
        }

        Csv(err: csv::Error) {
            from()
            source(err)
        }
    }
}

/// Alias type for results originated from this crate.
pub type Result<T> = ::std::result::Result<T, AnalysisError>;
