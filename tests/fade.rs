mod tests {
    use triac_fader::FadeRecord;

    #[test]
    fn test_brightness_at_endpoints_and_midpoint() {
        let fade = FadeRecord::for_channel(0, 0, 1023, 0, 10);
        assert_eq!(fade.brightness_at(0), Some(0));
        assert_eq!(fade.brightness_at(5), Some(512));
        assert_eq!(fade.brightness_at(10), Some(1023));
    }

    #[test]
    fn test_brightness_outside_interval() {
        let fade = FadeRecord::for_channel(2, 100, 200, 20, 30);
        assert_eq!(fade.brightness_at(19), None);
        assert_eq!(fade.brightness_at(31), None);
        assert!(fade.contains(20));
        assert!(fade.contains(30));
    }

    #[test]
    fn test_zero_length_fade_is_at_end_brightness() {
        let fade = FadeRecord::for_channel(1, 700, 40, 8, 8);
        assert_eq!(fade.duration(), 0);
        assert_eq!(fade.brightness_at(8), Some(40));
        assert_eq!(fade.brightness_at(7), None);
    }

    #[test]
    fn test_end_cycle_never_before_start() {
        let fade = FadeRecord::for_channel(0, 0, 10, 50, 40);
        assert_eq!(fade.end_cycle, 50);
        assert_eq!(fade.duration(), 0);
    }

    #[test]
    fn test_rising_fade_is_monotonic_without_overshoot() {
        let fade = FadeRecord::for_channel(0, 37, 1001, 1000, 1113);
        let mut previous = fade.start_brightness;
        for cycle in fade.start_cycle..=fade.end_cycle {
            let brightness = fade.brightness_at(cycle).unwrap();
            assert!(brightness >= previous);
            assert!((37..=1001).contains(&brightness));
            previous = brightness;
        }
        assert_eq!(previous, 1001);
    }

    #[test]
    fn test_falling_fade_is_monotonic_without_overshoot() {
        let fade = FadeRecord::for_channel(3, 1023, 0, 0, 600);
        let mut previous = fade.start_brightness;
        for cycle in 0..=600 {
            let brightness = fade.brightness_at(cycle).unwrap();
            assert!(brightness <= previous);
            previous = brightness;
        }
        assert_eq!(previous, 0);
        assert!(!fade.is_rising());
    }

    #[test]
    fn test_channel_mask() {
        let fade = FadeRecord::for_channel(5, 0, 1, 0, 1);
        assert_eq!(fade.channels, 1 << 5);
        assert!(fade.applies_to(5));
        assert!(!fade.applies_to(4));
        assert_eq!(fade.channel_iter().collect::<Vec<_>>(), vec![5]);

        let multi = FadeRecord {
            channels: 0b1001,
            ..fade
        };
        assert_eq!(multi.channel_iter().collect::<Vec<_>>(), vec![0, 3]);
    }
}
