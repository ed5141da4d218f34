#![no_std]
#![no_main]

extern crate alloc;

// Required for ESP-IDF bootloader compatibility
// Use explicit parameters to ensure correct efuse block revision values
esp_bootloader_esp_idf::esp_app_desc!(
    env!("CARGO_PKG_VERSION"),  // version
    env!("CARGO_PKG_NAME"),     // project_name
    "00:00:00",                 // build_time
    "2025-01-01",               // build_date
    "0.0.0",                    // idf_ver (not using IDF)
    0x10000,                    // mmu_page_size (64KB)
    0,                          // min_efuse_blk_rev_full (accept all)
    u16::MAX                    // max_efuse_blk_rev_full (accept all)
);

use embassy_executor::Spawner;
use esp_backtrace as _;
use esp_hal::gpio::{Input, InputConfig, Level, Output, OutputConfig, Pull};
use esp_hal::timer::timg::TimerGroup;
use static_cell::StaticCell;

use ble_encoder::ble::ChannelStack;
use ble_encoder::config;
use ble_encoder::encoder::driver::{encoder_task, SharedEncoder, ENCODER};
use ble_encoder::event_loop::{EventLoop, LoopConfig};
use ble_encoder::io::{ActiveLowButton, RgbLed};
use ble_encoder::tasks;

/// Static executor for embassy
static EXECUTOR: StaticCell<esp_rtos::embassy::Executor> = StaticCell::new();

/// Static cell for esp-radio controller (needed for 'static lifetime)
static RADIO_CONTROLLER: StaticCell<esp_radio::Controller<'static>> = StaticCell::new();

/// Type alias for the BLE controller
type BleController = trouble_host::prelude::ExternalController<
    esp_radio::ble::controller::BleConnector<'static>,
    10,
>;

type BoardLed = RgbLed<Output<'static>, Output<'static>, Output<'static>>;
type BoardLoop = EventLoop<ChannelStack, SharedEncoder, ActiveLowButton<Input<'static>>, BoardLed>;

#[esp_hal::main]
fn main() -> ! {
    // Initialise heap allocator for BLE support (64KB - BLE requires significant heap)
    esp_alloc::heap_allocator!(size: 64 * 1024);

    esp_println::logger::init_logger(log::LevelFilter::Info);

    let peripherals = esp_hal::init(esp_hal::Config::default());

    // Initialise the RTOS scheduler with timer - MUST be done before any async operations
    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    log::info!(
        "Encoder on GPIO{}/GPIO{}, button on GPIO{}, LED on GPIO{}/{}/{}",
        config::pins::ROT_ENC_A,
        config::pins::ROT_ENC_B,
        config::pins::BUTTON,
        config::pins::RED_LED,
        config::pins::GREEN_LED,
        config::pins::BLUE_LED,
    );

    let pull_up = InputConfig::default().with_pull(Pull::Up);
    let enc_a = Input::new(peripherals.GPIO8, pull_up);
    let enc_b = Input::new(peripherals.GPIO9, pull_up);
    let button = ActiveLowButton::new(Input::new(peripherals.GPIO10, pull_up));

    let led = RgbLed::new(
        Output::new(peripherals.GPIO2, Level::Low, OutputConfig::default()),
        Output::new(peripherals.GPIO1, Level::Low, OutputConfig::default()),
        Output::new(peripherals.GPIO0, Level::Low, OutputConfig::default()),
    );

    let event_loop = EventLoop::new(
        ChannelStack,
        SharedEncoder::new(&ENCODER),
        button,
        led,
        LoopConfig::default(),
    );

    // Initialise esp-radio for BLE support (must be after esp_rtos::start)
    let radio_controller = RADIO_CONTROLLER.init(
        esp_radio::init().expect("Failed to initialize esp-radio")
    );

    // Create BLE connector (ownership is passed to ExternalController)
    let ble_connector = esp_radio::ble::controller::BleConnector::new(
        radio_controller,
        peripherals.BT,
        esp_radio::ble::Config::default(),
    ).expect("Failed to initialize BLE connector");

    // Wrap in ExternalController for trouble-host compatibility
    let controller: BleController = trouble_host::prelude::ExternalController::new(ble_connector);

    // Create and run the embassy executor
    let executor = EXECUTOR.init(esp_rtos::embassy::Executor::new());
    executor.run(|spawner| {
        spawner.must_spawn(async_main(spawner, controller, enc_a, enc_b, event_loop));
    })
}

#[embassy_executor::task]
async fn async_main(
    spawner: Spawner,
    ble_controller: BleController,
    enc_a: Input<'static>,
    enc_b: Input<'static>,
    event_loop: BoardLoop,
) {
    spawner.spawn(ble_host_task(ble_controller)).unwrap();
    spawner.spawn(encoder_sampling_task(enc_a, enc_b)).unwrap();
    spawner.spawn(app_task(event_loop)).unwrap();
}

/// Task that owns the trouble-host stack
#[embassy_executor::task]
async fn ble_host_task(controller: BleController) {
    tasks::ble_task(controller).await;
}

/// Task that decodes encoder pin edges into position events
#[embassy_executor::task]
async fn encoder_sampling_task(enc_a: Input<'static>, enc_b: Input<'static>) {
    encoder_task(enc_a, enc_b, &ENCODER).await;
}

/// Task that runs the encoder application
#[embassy_executor::task]
async fn app_task(event_loop: BoardLoop) {
    tasks::app_task(event_loop).await;
}
