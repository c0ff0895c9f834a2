/// Returns whether or not a wrapping number is greater than another
/// sequence_greater_than(2,1) will return true
/// sequence_greater_than(1,2) will return false
/// sequence_greater_than(1,1) will return false
pub fn sequence_greater_than(s1: u16, s2: u16) -> bool {
    ((s1 > s2) && (s1 - s2 <= 32768)) || ((s1 < s2) && (s2 - s1 > 32768))
}

/// Returns whether or not a wrapping number is less than another
/// sequence_less_than(1,2) will return true
/// sequence_less_than(2,1) will return false
/// sequence_less_than(1,1) will return false
pub fn sequence_less_than(s1: u16, s2: u16) -> bool {
    sequence_greater_than(s2, s1)
}

/// Distance travelled from `from` forward to `to`, across the wrap.
///
/// # Examples
/// ```
/// # use troupe_shared::forward_distance;
/// assert_eq!(forward_distance(1, 2), 1);
/// assert_eq!(forward_distance(65535, 0), 1);
/// assert_eq!(forward_distance(5, 5), 0);
/// ```
pub fn forward_distance(from: u16, to: u16) -> u16 {
    to.wrapping_sub(from)
}
