use crate::codegen::c_like::{c_print_name, EmitterState};

/// WGSL identifier for an IR name.
///
/// WGSL reserves identifiers that start with `__`, so those get a `v`
/// prefix. Buffers are wrapped in a struct by the binder, so every use of a
/// registered buffer goes through its `data` field.
pub fn mangle(name: &str, state: &EmitterState) -> String {
    let mut id = c_print_name(name);
    if id.starts_with("__") {
        id.insert(0, 'v');
    }
    if state.is_buffer(name) {
        id.push_str(".data");
    }
    id
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CodegenConfig;
    use crate::ir::Type;

    #[test]
    fn test_plain_names() {
        let state = EmitterState::new(&CodegenConfig::default());
        assert_eq!(mangle("n", &state), "_n");
        assert_eq!(mangle("f.s0.x.__thread_id_x", &state), "_f_s0_x___thread_id_x");
        assert_eq!(mangle("_t3", &state), "_t3");
    }

    #[test]
    fn test_double_underscore_prefixed() {
        let state = EmitterState::new(&CodegenConfig::default());
        assert_eq!(mangle("__shared", &state), "v__shared");
        assert_eq!(mangle("$tmp", &state), "v__tmp");
        assert_eq!(mangle("-a", &state), "v___a");
    }

    #[test]
    fn test_registered_buffer_gets_data_field() {
        let mut state = EmitterState::new(&CodegenConfig::default());
        assert_eq!(mangle("buf", &state), "_buf");
        state.register_buffer("buf", Type::f32());
        assert_eq!(mangle("buf", &state), "_buf.data");
        assert_eq!(mangle("buf2", &state), "_buf2");
        state.reset_kernel();
        assert_eq!(mangle("buf", &state), "_buf");
    }
}
