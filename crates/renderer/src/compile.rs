use std::borrow::Cow;

use wgpu::naga;

use crate::field::SHADER_WGSL;
use crate::host::SurfaceError;

/// Compiles the field program on `device`.
///
/// Validation errors are captured with an error scope so a broken driver or
/// shader surfaces as [`SurfaceError::Compile`] instead of the uncaptured
/// error handler.
pub(crate) fn compile_field_shader(device: &wgpu::Device) -> Result<wgpu::ShaderModule, SurfaceError> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("liquid ether field"),
        source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(SHADER_WGSL)),
    });
    if let Some(err) = pollster::block_on(device.pop_error_scope()) {
        return Err(SurfaceError::Compile(err.to_string()));
    }
    Ok(module)
}

/// Parses and validates WGSL without a device.
pub fn validate_wgsl(source: &str) -> Result<(), SurfaceError> {
    let module = naga::front::wgsl::parse_str(source)
        .map_err(|err| SurfaceError::Compile(err.emit_to_string(source)))?;
    naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::default(),
    )
    .validate(&module)
    .map_err(|err| SurfaceError::Compile(err.emit_to_string(source)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_shader_validates() {
        if let Err(err) = validate_wgsl(SHADER_WGSL) {
            panic!("{err}");
        }
    }

    #[test]
    fn broken_source_reports_compile_error() {
        let err = validate_wgsl("fn fs_main( -> {").unwrap_err();
        assert!(matches!(err, SurfaceError::Compile(_)));
    }
}
