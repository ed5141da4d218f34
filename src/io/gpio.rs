//! `embedded-hal` pin adapters for the button and the LED

use embedded_hal::digital::{InputPin, OutputPin, PinState};

use crate::error::GpioError;
use crate::zone::LedColor;

use super::traits::{Button, Led};

/// Button wired to ground with a pull-up: low means pressed
pub struct ActiveLowButton<P> {
    pin: P,
}

impl<P: InputPin> ActiveLowButton<P> {
    pub fn new(pin: P) -> Self {
        Self { pin }
    }
}

impl<P: InputPin> Button for ActiveLowButton<P> {
    fn is_pressed(&mut self) -> Result<bool, GpioError> {
        self.pin.is_low().map_err(|_| GpioError)
    }
}

/// Common-cathode RGB LED on three output pins
pub struct RgbLed<R, G, B> {
    red: R,
    green: G,
    blue: B,
}

impl<R: OutputPin, G: OutputPin, B: OutputPin> RgbLed<R, G, B> {
    pub fn new(red: R, green: G, blue: B) -> Self {
        Self { red, green, blue }
    }
}

impl<R: OutputPin, G: OutputPin, B: OutputPin> Led for RgbLed<R, G, B> {
    fn set_color(&mut self, color: LedColor) -> Result<(), GpioError> {
        self.red
            .set_state(PinState::from(color.red))
            .map_err(|_| GpioError)?;
        self.green
            .set_state(PinState::from(color.green))
            .map_err(|_| GpioError)?;
        self.blue
            .set_state(PinState::from(color.blue))
            .map_err(|_| GpioError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;
    use core::convert::Infallible;
    use embedded_hal::digital::{ErrorKind, ErrorType};

    struct FakeInput<'a> {
        high: &'a Cell<bool>,
    }

    impl ErrorType for FakeInput<'_> {
        type Error = Infallible;
    }

    impl InputPin for FakeInput<'_> {
        fn is_high(&mut self) -> Result<bool, Self::Error> {
            Ok(self.high.get())
        }

        fn is_low(&mut self) -> Result<bool, Self::Error> {
            Ok(!self.high.get())
        }
    }

    struct FakeOutput<'a> {
        high: &'a Cell<bool>,
    }

    impl ErrorType for FakeOutput<'_> {
        type Error = Infallible;
    }

    impl OutputPin for FakeOutput<'_> {
        fn set_low(&mut self) -> Result<(), Self::Error> {
            self.high.set(false);
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Self::Error> {
            self.high.set(true);
            Ok(())
        }
    }

    struct BrokenOutput;

    impl ErrorType for BrokenOutput {
        type Error = ErrorKind;
    }

    impl OutputPin for BrokenOutput {
        fn set_low(&mut self) -> Result<(), Self::Error> {
            Err(ErrorKind::Other)
        }

        fn set_high(&mut self) -> Result<(), Self::Error> {
            Err(ErrorKind::Other)
        }
    }

    #[test]
    fn test_button_is_active_low() {
        let level = Cell::new(true);
        let mut button = ActiveLowButton::new(FakeInput { high: &level });

        assert!(!button.is_pressed().unwrap());
        level.set(false);
        assert!(button.is_pressed().unwrap());
    }

    #[test]
    fn test_led_drives_each_channel() {
        let (r, g, b) = (Cell::new(false), Cell::new(false), Cell::new(true));
        let mut led = RgbLed::new(
            FakeOutput { high: &r },
            FakeOutput { high: &g },
            FakeOutput { high: &b },
        );

        led.set_color(LedColor::YELLOW).unwrap();
        assert_eq!((r.get(), g.get(), b.get()), (true, true, false));

        led.set_color(LedColor::RED).unwrap();
        assert_eq!((r.get(), g.get(), b.get()), (true, false, false));
    }

    #[test]
    fn test_led_pin_failure() {
        let g = Cell::new(false);
        let b = Cell::new(false);
        let mut led = RgbLed::new(BrokenOutput, FakeOutput { high: &g }, FakeOutput { high: &b });

        assert_eq!(led.set_color(LedColor::GREEN), Err(GpioError));
    }
}
