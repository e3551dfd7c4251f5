//! Two-channel PWM H-bridge drive (one PWM line per direction plus an enable).

/// PWM carrier frequency used for both direction lines.
pub const PWM_FREQ_HZ: f64 = 500.0;

/// Duty cycle in `[0.0, 1.0]` for a speed percentage.
#[inline]
pub fn duty_for_speed(speed: u8) -> f64 {
    f64::from(speed.min(100)) / 100.0
}

#[cfg(feature = "hardware")]
pub use hw::PwmActuator;

#[cfg(feature = "hardware")]
mod hw {
    use super::*;
    use crate::error::{HwError, Result};
    use desk_traits::{Actuator, BoxError};
    use rppal::gpio::{Gpio, OutputPin};

    fn gpio_err(e: rppal::gpio::Error) -> HwError {
        HwError::Gpio(e.to_string())
    }

    pub struct PwmActuator {
        up: OutputPin,
        down: OutputPin,
        en: OutputPin,
    }

    impl PwmActuator {
        pub fn new(up_pin: u8, down_pin: u8, en_pin: u8) -> Result<Self> {
            let gpio = Gpio::new().map_err(gpio_err)?;
            let up = gpio.get(up_pin).map_err(gpio_err)?.into_output_low();
            let down = gpio.get(down_pin).map_err(gpio_err)?.into_output_low();
            let en = gpio.get(en_pin).map_err(gpio_err)?.into_output_low();
            let mut act = Self { up, down, en };
            act.halt()?;
            Ok(act)
        }

        fn drive(&mut self, up_duty: f64, down_duty: f64) -> Result<()> {
            self.en.set_high();
            self.up
                .set_pwm_frequency(PWM_FREQ_HZ, up_duty)
                .map_err(gpio_err)?;
            self.down
                .set_pwm_frequency(PWM_FREQ_HZ, down_duty)
                .map_err(gpio_err)?;
            Ok(())
        }

        fn halt(&mut self) -> Result<()> {
            self.up.clear_pwm().map_err(gpio_err)?;
            self.down.clear_pwm().map_err(gpio_err)?;
            self.up.set_low();
            self.down.set_low();
            self.en.set_low();
            Ok(())
        }
    }

    impl Actuator for PwmActuator {
        fn drive_up(&mut self, speed: u8) -> std::result::Result<(), BoxError> {
            Ok(self.drive(duty_for_speed(speed), 0.0)?)
        }
        fn drive_down(&mut self, speed: u8) -> std::result::Result<(), BoxError> {
            Ok(self.drive(0.0, duty_for_speed(speed))?)
        }
        fn stop(&mut self) -> std::result::Result<(), BoxError> {
            Ok(self.halt()?)
        }
    }

    impl Drop for PwmActuator {
        fn drop(&mut self) {
            if let Err(e) = self.halt() {
                tracing::warn!(error = %e, "failed to stop actuator on drop");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::duty_for_speed;

    #[test]
    fn duty_is_clamped_fraction() {
        assert_eq!(duty_for_speed(0), 0.0);
        assert_eq!(duty_for_speed(50), 0.5);
        assert_eq!(duty_for_speed(100), 1.0);
        assert_eq!(duty_for_speed(250), 1.0);
    }
}
