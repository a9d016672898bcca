#![no_main]
use batmon_core::PowerSupplyView;
use batmon_core::power_supply::MAX_BLOCK_BYTES;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    let mut view = PowerSupplyView::new();
    if view.apply(data).is_ok() {
        assert!(view.block().render().len() <= MAX_BLOCK_BYTES);
        let _ = view.capacity_level();
    }
});
