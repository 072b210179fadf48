//! Example of using the TM1638 on an RP2040 board like the Pi Pico

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use embassy_rp;
use embassy_time::Timer;
use {defmt_rtt as _, panic_probe as _};

use tm1638;

#[embassy_executor::main]
async fn main(_spawner: Spawner) {
    let p = embassy_rp::init(Default::default());

    // Instantiate the TM1638 interface using a bit-banging implementation of the TM1638 bus
    // interface implemented using the `embassy-rp` HAL and the `embassy-time` delay.
    let mut tm1638 = tm1638::Tm1638::builder()
        .brightness(2)
        .with_embassy_delay()
        .with_embassy_rp_pins(p.PIN_6, p.PIN_7, p.PIN_8)
        .build()
        .unwrap();
    tm1638.init().unwrap();

    debug!("Hello!  Press one of the buttons on the board!");

    let mut previous = tm1638::Keys::default();

    loop {
        let keys = tm1638.read_keys().unwrap();

        if keys != previous {
            debug!("keys = {=u32:x}", keys.bits());

            // Full brightness while anything is held down
            let brightness = if keys.any_pressed() { 7 } else { 2 };
            tm1638.set_brightness(brightness).unwrap();

            // Illuminate the LEDs for any rows that have a pressed key in them.  The LEDs are on
            // the odd display registers; boards with 8 switches usually wire one per row.
            let mut leds = [0u8; tm1638::DISPLAY_REGISTERS];
            let bitmask = keys.rows_bitmask();
            for row in 0..8 {
                leds[2 * row + 1] = (bitmask >> row) & 0x01;
            }
            tm1638.write_display_buffer(0, &leds).unwrap();

            for (col, row) in keys.iter() {
                debug!("col {}, row {}", col, row);
            }

            previous = keys;
        }

        Timer::after_millis(10).await;
    }
}
